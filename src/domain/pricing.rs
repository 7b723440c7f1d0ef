// ==========================================
// 价格表导入与定价引擎 - 定价领域模型
// ==========================================
// 职责: 定价参数 / 汇率 / 等效型号 / 渠道价格结果
// ==========================================

use crate::domain::product::ProductRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// 参数边界
// ==========================================
pub mod bounds {
    pub const IVA: (f64, f64) = (0.0, 100.0);
    pub const MARKUP: (f64, f64) = (0.0, 1000.0);
    pub const COMMISSION: (f64, f64) = (0.0, 100.0);
    pub const CAPACITY_FACTOR: (f64, f64) = (0.0, 100.0);
    pub const MAX_ROUNDING_DECIMALS: u32 = 6;
}

// ==========================================
// PricingConfig - 定价参数快照
// ==========================================
// 每次运行加载一次，运行内只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// 增值税（百分比）
    pub iva: f64,
    /// 渠道顺序（计算与输出按此顺序）
    #[serde(default)]
    pub channels: Vec<String>,
    /// 渠道加价率（百分比）
    pub markups: BTreeMap<String, f64>,
    /// 渠道佣金（百分比）
    #[serde(default)]
    pub commissions: BTreeMap<String, f64>,
    /// 容量档位（Ah）→ 调整系数（百分比）
    #[serde(default)]
    pub capacity_factors: BTreeMap<u32, f64>,
    /// 无匹配档位时使用的系数（百分比）
    #[serde(default)]
    pub factor_base: f64,
    /// 最终价格保留小数位
    #[serde(default)]
    pub rounding_decimals: u32,
}

impl PricingConfig {
    /// 渠道列表：未显式配置时按 markups 键排序
    pub fn channel_order(&self) -> Vec<String> {
        if self.channels.is_empty() {
            self.markups.keys().cloned().collect()
        } else {
            self.channels.clone()
        }
    }

    /// 按容量取调整系数（精确档位优先，回退 factor_base）
    pub fn capacity_factor_for(&self, capacity_ah: Option<u32>) -> f64 {
        capacity_ah
            .and_then(|ah| self.capacity_factors.get(&ah).copied())
            .unwrap_or(self.factor_base)
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        let channels = vec![
            "wholesale".to_string(),
            "direct".to_string(),
            "distributor".to_string(),
        ];
        let markups = BTreeMap::from([
            ("wholesale".to_string(), 22.0),
            ("direct".to_string(), 60.0),
            ("distributor".to_string(), 35.0),
        ]);
        let commissions = BTreeMap::from([
            ("wholesale".to_string(), 5.0),
            ("direct".to_string(), 0.0),
            ("distributor".to_string(), 3.0),
        ]);
        Self {
            iva: 21.0,
            channels,
            markups,
            commissions,
            capacity_factors: BTreeMap::new(),
            factor_base: 0.0,
            rounding_decimals: 0,
        }
    }
}

// ==========================================
// FxInfo - 汇率报价
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxInfo {
    pub buy: f64,
    pub sell: f64,
    pub date: String,
    pub source: String,
}

impl FxInfo {
    pub fn is_usable(&self) -> bool {
        self.sell.is_finite() && self.sell > 0.0
    }
}

// ==========================================
// EquivalenceRecord - 等效型号（电池容量）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquivalenceRecord {
    pub model_code: String,
    pub equivalent_model: Option<String>,
    pub brand: Option<String>,
    pub capacity_ah: Option<u32>,
}

// ==========================================
// PriceResult - 单渠道价格
// ==========================================
// 中间值保留全精度，仅 final_price 取整
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceResult {
    pub base_price: f64,
    pub price_with_iva: f64,
    pub price_with_markup: f64,
    pub final_price: f64,
    pub markup_applied: f64,
    pub commission_applied: f64,
    pub margin_pct: f64,
}

// ==========================================
// ChannelOutcome - 渠道计算结果
// ==========================================
// 单渠道失败不影响其他渠道
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelOutcome {
    Priced { channel: String, result: PriceResult },
    Failed { channel: String, reason: String },
}

impl ChannelOutcome {
    pub fn channel(&self) -> &str {
        match self {
            ChannelOutcome::Priced { channel, .. } | ChannelOutcome::Failed { channel, .. } => {
                channel
            }
        }
    }

    pub fn result(&self) -> Option<&PriceResult> {
        match self {
            ChannelOutcome::Priced { result, .. } => Some(result),
            ChannelOutcome::Failed { .. } => None,
        }
    }
}

// ==========================================
// ProductPricing - 产品 + 各渠道结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPricing {
    pub record: ProductRecord,
    /// 换算 + 容量调整后的基准价
    pub resolved_base_price: f64,
    pub fx_rate_applied: Option<f64>,
    pub capacity_factor_applied: Option<f64>,
    pub channels: Vec<ChannelOutcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ProductPricing {
    pub fn channel(&self, name: &str) -> Option<&ChannelOutcome> {
        self.channels.iter().find(|c| c.channel() == name)
    }
}
