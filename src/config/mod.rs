// ==========================================
// 价格表导入与定价引擎 - 配置层
// ==========================================
// 职责: 定价参数读取与校验，支持多来源按序回退
// 存储: config_kv 表 / JSON 文件 / 内置默认值
// 红线: 引擎只读配置，不负责配置写入
// ==========================================

pub mod chain;
pub mod error;
pub mod json_provider;
pub mod provider;
pub mod sqlite_provider;
pub mod validator;

// 重导出核心类型
pub use chain::{ConfigProviderChain, DEFAULT_PROVIDER_TIMEOUT};
pub use error::{ConfigError, ConfigResult, ProviderAttempt};
pub use json_provider::JsonFileConfigProvider;
pub use provider::{ConfigProvider, LoadedConfig, StaticConfigProvider};
pub use sqlite_provider::{config_keys, SqliteConfigProvider};
pub use validator::{channel_params, validate, validate_shared, ChannelParams};
