// ==========================================
// 价格表导入与定价引擎 - 汇率层
// ==========================================
// 职责: 外币（美元）报价换算所需的汇率获取
// 组成: 实时来源 + 进程内缓存 + 持久化降级
// ==========================================

pub mod cached;
pub mod error;
pub mod http_source;
pub mod provider;
pub mod sqlite_store;

// 重导出核心类型
pub use cached::{
    CachedFxProvider, FxRateCache, DEFAULT_CACHE_TTL, DEFAULT_FETCH_TIMEOUT, MAX_FETCH_ATTEMPTS,
};
pub use error::{FxError, FxResult};
pub use http_source::{parse_quote, HttpFxSource};
pub use provider::{FxProvider, FxRateSource, FxRateStore, StaticFxProvider};
pub use sqlite_store::SqliteFxRateStore;
