// ==========================================
// 价格表导入与定价引擎 - 配置读取 Trait
// ==========================================
// 职责: 定义引擎所需的定价参数读取接口
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::error::{ConfigResult, ProviderAttempt};
use crate::domain::pricing::PricingConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ==========================================
// LoadedConfig - 配置快照 + 来源诊断
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedConfig {
    pub config: PricingConfig,
    pub source: String,                 // 实际提供配置的来源
    pub attempts: Vec<ProviderAttempt>, // 在其之前失败的来源
}

// ==========================================
// ConfigProvider Trait
// ==========================================
// 实现者:
// - SqliteConfigProvider（config_kv 表）
// - JsonFileConfigProvider（JSON 文件）
// - StaticConfigProvider（内置默认值 / 测试）
// - ConfigProviderChain（按序组合）
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// 来源名称（用于日志与失败记录）
    fn name(&self) -> &str;

    /// 读取定价参数快照
    ///
    /// # 返回
    /// - Ok(PricingConfig): 原样返回，边界校验由调用方负责
    /// - Err(ConfigError::NotFound): 该来源无配置，链路可继续尝试下一个来源
    async fn get(&self) -> ConfigResult<PricingConfig>;

    /// 读取定价参数并附带来源信息（组合来源覆盖此方法以上报回退过程）
    async fn load(&self) -> ConfigResult<LoadedConfig> {
        let config = self.get().await?;
        Ok(LoadedConfig {
            config,
            source: self.name().to_string(),
            attempts: Vec::new(),
        })
    }
}

// ==========================================
// StaticConfigProvider - 固定配置
// ==========================================
pub struct StaticConfigProvider {
    name: String,
    config: PricingConfig,
}

impl StaticConfigProvider {
    pub fn new(config: PricingConfig) -> Self {
        Self {
            name: "static".to_string(),
            config,
        }
    }

    /// 内置默认参数（iva 21，wholesale / direct / distributor）
    pub fn defaults() -> Self {
        Self {
            name: "defaults".to_string(),
            config: PricingConfig::default(),
        }
    }
}

#[async_trait]
impl ConfigProvider for StaticConfigProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self) -> ConfigResult<PricingConfig> {
        Ok(self.config.clone())
    }
}
