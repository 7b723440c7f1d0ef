// ==========================================
// 价格表导入与定价引擎 - 配置层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 单个 provider 的失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAttempt {
    pub provider: String,
    pub message: String,
}

impl fmt::Display for ProviderAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.message)
    }
}

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    // ===== 参数校验错误 =====
    #[error("配置参数非法: {field} = {value} ({reason})")]
    Invalid {
        field: String,
        value: String,
        reason: String,
    },

    // ===== 来源错误 =====
    #[error("配置来源 {provider} 无可用配置")]
    NotFound { provider: String },

    #[error("配置存储读取失败: {0}")]
    Storage(String),

    #[error("配置解析失败: {0}")]
    Parse(String),

    #[error("配置来源 {provider} 超时 ({timeout_ms} ms)")]
    Timeout { provider: String, timeout_ms: u64 },

    #[error("所有配置来源均失败: [{}]", attempts.iter().map(|a| a.to_string()).collect::<Vec<_>>().join("; "))]
    AllProvidersFailed { attempts: Vec<ProviderAttempt> },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, value: impl ToString, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// 来源缺失 / 不可达时链路可继续尝试下一个来源；
    /// 来源存在但内容非法（Invalid / Parse）时必须终止
    pub fn allows_fallback(&self) -> bool {
        matches!(
            self,
            ConfigError::NotFound { .. }
                | ConfigError::Storage(_)
                | ConfigError::Timeout { .. }
                | ConfigError::AllProvidersFailed { .. }
        )
    }
}

impl From<rusqlite::Error> for ConfigError {
    fn from(err: rusqlite::Error) -> Self {
        ConfigError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Storage(err.to_string())
    }
}

/// Result 类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_classification() {
        assert!(ConfigError::NotFound { provider: "sqlite".into() }.allows_fallback());
        assert!(ConfigError::Storage("no such table".into()).allows_fallback());
        assert!(!ConfigError::invalid("iva", "21%", "必须为数值").allows_fallback());
        assert!(!ConfigError::Parse("expected value".into()).allows_fallback());
    }
}
