// ==========================================
// 价格表导入与定价引擎 - 带缓存的汇率提供者
// ==========================================
// 流程:
// 1. 缓存未过期 → 直接返回
// 2. 实时来源: 最多 1 次获取 + 1 次重试，每次受超时约束
// 3. 成功 → 写缓存 + 持久化（持久化失败仅告警）
// 4. 失败 → 读取最近一次持久化汇率（不写缓存，下次仍尝试实时来源）
// 5. 仍无 → None
// 并发: 多个调用同时未命中时可能重复获取，后写者覆盖
// ==========================================

use crate::domain::pricing::FxInfo;
use crate::fx::error::FxError;
use crate::fx::provider::{FxProvider, FxRateSource, FxRateStore};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 缓存有效期默认值
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);
/// 单次获取超时默认值
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
/// 获取次数上限（首次 + 重试）
pub const MAX_FETCH_ATTEMPTS: usize = 2;

// ==========================================
// FxRateCache - 汇率缓存（单值 + TTL）
// ==========================================
#[derive(Debug, Clone)]
struct CachedRate {
    rate: FxInfo,
    fetched_at: Instant,
}

#[derive(Debug)]
pub struct FxRateCache {
    entry: RwLock<Option<CachedRate>>,
    ttl: Duration,
}

impl FxRateCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: RwLock::new(None),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 未过期的缓存值（锁中毒视为未命中）
    pub fn get_fresh(&self) -> Option<FxInfo> {
        let guard = self.entry.read().ok()?;
        guard
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| cached.rate.clone())
    }

    pub fn put(&self, rate: FxInfo) {
        if let Ok(mut guard) = self.entry.write() {
            *guard = Some(CachedRate {
                rate,
                fetched_at: Instant::now(),
            });
        }
    }

    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.entry.write() {
            *guard = None;
        }
    }
}

impl Default for FxRateCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

// ==========================================
// CachedFxProvider
// ==========================================
pub struct CachedFxProvider {
    source: Arc<dyn FxRateSource>,
    store: Option<Arc<dyn FxRateStore>>,
    cache: FxRateCache,
    fetch_timeout: Duration,
}

impl CachedFxProvider {
    pub fn new(source: Arc<dyn FxRateSource>) -> Self {
        Self {
            source,
            store: None,
            cache: FxRateCache::default(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn FxRateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache = FxRateCache::new(ttl);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn cache(&self) -> &FxRateCache {
        &self.cache
    }

    /// 实时获取（含一次重试）
    async fn fetch_live(&self) -> Option<FxInfo> {
        for attempt in 1..=MAX_FETCH_ATTEMPTS {
            let result = match tokio::time::timeout(self.fetch_timeout, self.source.fetch()).await {
                Ok(Ok(rate)) if rate.is_usable() => Ok(rate),
                Ok(Ok(rate)) => Err(FxError::InvalidRate { sell: rate.sell }),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(FxError::Timeout {
                    timeout_ms: self.fetch_timeout.as_millis() as u64,
                }),
            };

            match result {
                Ok(rate) => {
                    info!(source = self.source.name(), sell = rate.sell, date = %rate.date, "汇率获取成功");
                    return Some(rate);
                }
                Err(e) => warn!(source = self.source.name(), attempt, error = %e, "汇率获取失败"),
            }
        }
        None
    }

    /// 读取最近一次持久化的汇率
    async fn load_fallback(&self) -> Option<FxInfo> {
        let store = self.store.as_ref()?;
        match store.load_latest().await {
            Ok(Some(rate)) if rate.is_usable() => {
                warn!(date = %rate.date, sell = rate.sell, "实时汇率不可用，使用最近一次持久化汇率");
                Some(rate)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "读取持久化汇率失败");
                None
            }
        }
    }
}

#[async_trait]
impl FxProvider for CachedFxProvider {
    async fn get_rate(&self) -> Option<FxInfo> {
        if let Some(rate) = self.cache.get_fresh() {
            debug!(sell = rate.sell, "汇率缓存命中");
            return Some(rate);
        }

        if let Some(rate) = self.fetch_live().await {
            self.cache.put(rate.clone());
            if let Some(store) = &self.store {
                if let Err(e) = store.save(&rate).await {
                    warn!(error = %e, "汇率持久化失败");
                }
            }
            return Some(rate);
        }

        self.load_fallback().await
    }
}
