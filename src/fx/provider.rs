// ==========================================
// 价格表导入与定价引擎 - 汇率读取 Trait
// ==========================================
// 职责: 定义汇率读取 / 获取 / 持久化接口
// 分层:
// - FxProvider: 引擎消费的窄接口（无可用汇率 → None）
// - FxRateSource: 实时来源（HTTP 等）
// - FxRateStore: 最近一次成功汇率的持久化（降级用）
// ==========================================

use crate::domain::pricing::FxInfo;
use crate::fx::error::FxResult;
use async_trait::async_trait;

#[async_trait]
pub trait FxProvider: Send + Sync {
    /// 获取当前可用汇率
    ///
    /// # 返回
    /// - Some(FxInfo): 可用汇率（sell > 0）
    /// - None: 无可用汇率，由流水线决定是否失败
    async fn get_rate(&self) -> Option<FxInfo>;
}

#[async_trait]
pub trait FxRateSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> FxResult<FxInfo>;
}

#[async_trait]
pub trait FxRateStore: Send + Sync {
    /// 最近一次保存的汇率
    async fn load_latest(&self) -> FxResult<Option<FxInfo>>;

    async fn save(&self, rate: &FxInfo) -> FxResult<()>;
}

// ==========================================
// StaticFxProvider - 固定汇率（离线运行 / 测试）
// ==========================================
pub struct StaticFxProvider {
    rate: Option<FxInfo>,
}

impl StaticFxProvider {
    pub fn new(rate: FxInfo) -> Self {
        Self { rate: Some(rate) }
    }

    /// 以卖出价构造（买入价同值）
    pub fn with_sell(sell: f64) -> Self {
        Self::new(FxInfo {
            buy: sell,
            sell,
            date: String::new(),
            source: "static".to_string(),
        })
    }

    /// 始终无汇率
    pub fn unavailable() -> Self {
        Self { rate: None }
    }
}

#[async_trait]
impl FxProvider for StaticFxProvider {
    async fn get_rate(&self) -> Option<FxInfo> {
        self.rate.clone().filter(FxInfo::is_usable)
    }
}
