// ==========================================
// 价格表导入与定价引擎 - JSON 文件配置来源
// ==========================================
// 格式: PricingConfig 的 serde 表示
// {
//   "iva": 21,
//   "channels": ["wholesale", "direct"],
//   "markups": {"wholesale": 22, "direct": 60},
//   "commissions": {"wholesale": 5},
//   "capacity_factors": {"75": 8.5},
//   "factor_base": 0,
//   "rounding_decimals": 0
// }
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::provider::ConfigProvider;
use crate::domain::pricing::PricingConfig;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

pub struct JsonFileConfigProvider {
    path: PathBuf,
}

impl JsonFileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ConfigProvider for JsonFileConfigProvider {
    fn name(&self) -> &str {
        "json_file"
    }

    async fn get(&self) -> ConfigResult<PricingConfig> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound {
                    provider: format!("json_file({})", self.path.display()),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let config: PricingConfig = serde_json::from_str(&content)?;
        debug!(path = %self.path.display(), channels = config.channel_order().len(), "JSON 配置读取完成");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_read_json_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"iva": 10.5, "markups": {{"direct": 30}}, "commissions": {{"direct": 2}}}}"#
        )
        .unwrap();

        let config = JsonFileConfigProvider::new(file.path()).get().await.unwrap();
        assert_eq!(config.iva, 10.5);
        assert_eq!(config.channel_order(), vec!["direct"]);
        assert_eq!(config.commissions.get("direct"), Some(&2.0));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let provider = JsonFileConfigProvider::new("/nonexistent/pricing.json");
        let err = provider.get().await.unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_malformed_json_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = JsonFileConfigProvider::new(file.path()).get().await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
