// ==========================================
// 价格表导入与定价引擎 - 配置来源链
// ==========================================
// 职责: 按序尝试多个 ConfigProvider，首个成功者胜出
// 规则:
// - 每个来源单独受超时约束
// - 来源缺失 / 存储不可读 / 超时 → 记录失败并尝试下一个来源
// - 来源存在但内容非法（Invalid / Parse）→ 立即返回，不回退到默认值
// - 成功时返回来源名称及之前的失败记录
// - 全部失败 → AllProvidersFailed（逐个列出失败原因）
// - 链本身也是 ConfigProvider，可嵌套组合
// ==========================================

use crate::config::error::{ConfigError, ConfigResult, ProviderAttempt};
use crate::config::provider::{ConfigProvider, LoadedConfig};
use crate::domain::pricing::PricingConfig;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 单来源默认超时
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(3);

pub struct ConfigProviderChain {
    providers: Vec<Arc<dyn ConfigProvider>>,
    timeout: Duration,
}

impl Default for ConfigProviderChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigProviderChain {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    /// 追加来源（按追加顺序尝试）
    pub fn with_provider(mut self, provider: Arc<dyn ConfigProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl ConfigProvider for ConfigProviderChain {
    fn name(&self) -> &str {
        "chain"
    }

    async fn get(&self) -> ConfigResult<PricingConfig> {
        self.load().await.map(|loaded| loaded.config)
    }

    async fn load(&self) -> ConfigResult<LoadedConfig> {
        let mut attempts = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let outcome = tokio::time::timeout(self.timeout, provider.load()).await;
            let err = match outcome {
                Ok(Ok(mut loaded)) => {
                    info!(
                        provider = %loaded.source,
                        failed_before = attempts.len(),
                        "定价参数加载完成"
                    );
                    attempts.append(&mut loaded.attempts);
                    loaded.attempts = attempts;
                    return Ok(loaded);
                }
                Ok(Err(e)) => e,
                Err(_) => ConfigError::Timeout {
                    provider: provider.name().to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                },
            };

            if !err.allows_fallback() {
                warn!(provider = provider.name(), error = %err, "配置来源内容非法，终止回退");
                return Err(err);
            }

            warn!(provider = provider.name(), error = %err, "配置来源失败，尝试下一个");
            attempts.push(ProviderAttempt {
                provider: provider.name().to_string(),
                message: err.to_string(),
            });
        }

        Err(ConfigError::AllProvidersFailed { attempts })
    }
}
