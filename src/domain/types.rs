// ==========================================
// 价格表导入与定价引擎 - 领域类型定义
// ==========================================
// 职责: 规范列角色 / 币种 / 选表模式 / 汇率策略 / 流水线阶段
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 规范列角色 (Canonical Role)
// ==========================================
// 顺序即解析顺序: 先被占用的列不会再分配给后续角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalRole {
    Price,       // 价格
    Model,       // 型号 / 编码
    Brand,       // 品牌
    Description, // 描述
    Category,    // 分类
}

impl CanonicalRole {
    /// 全部角色（按解析顺序）
    pub const ALL: [CanonicalRole; 5] = [
        CanonicalRole::Price,
        CanonicalRole::Model,
        CanonicalRole::Brand,
        CanonicalRole::Description,
        CanonicalRole::Category,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalRole::Price => "price",
            CanonicalRole::Model => "model",
            CanonicalRole::Brand => "brand",
            CanonicalRole::Description => "description",
            CanonicalRole::Category => "category",
        }
    }
}

impl fmt::Display for CanonicalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 价格列模式优先级
// ==========================================
// 数值越小优先级越高
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricePriority {
    RecommendedPublic = 1, // 建议零售价 / 线下公开价
    SaleOrList = 2,        // 通用售价 / 目录价
    CostOrValue = 3,       // 通用成本 / 金额
}

impl PricePriority {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(PricePriority::RecommendedPublic),
            2 => Some(PricePriority::SaleOrList),
            3 => Some(PricePriority::CostOrValue),
            _ => None,
        }
    }

    pub fn level(&self) -> u8 {
        *self as u8
    }
}

// ==========================================
// 币种 (Currency Unit)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CurrencyUnit {
    Local,   // 本币
    Foreign, // 外币（美元）
}

impl fmt::Display for CurrencyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurrencyUnit::Local => write!(f, "LOCAL"),
            CurrencyUnit::Foreign => write!(f, "FOREIGN"),
        }
    }
}

// ==========================================
// 选表模式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionMode {
    #[default]
    Single, // 仅选最高分工作表
    Multi,  // 所有得分 > 0 的工作表
}

// ==========================================
// 外币换算策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FxPolicy {
    /// 外币价格表直接拒绝
    Reject,
    /// 必须换算，汇率不可用时整表失败
    #[default]
    Convert,
    /// 尽量换算，汇率不可用时按原值计算并记录告警
    ConvertOrKeep,
}

impl FxPolicy {
    pub fn conversion_enabled(&self) -> bool {
        !matches!(self, FxPolicy::Reject)
    }

    pub fn conversion_mandatory(&self) -> bool {
        matches!(self, FxPolicy::Convert)
    }
}

impl fmt::Display for FxPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FxPolicy::Reject => write!(f, "REJECT"),
            FxPolicy::Convert => write!(f, "CONVERT"),
            FxPolicy::ConvertOrKeep => write!(f, "CONVERT_OR_KEEP"),
        }
    }
}

// ==========================================
// 流水线阶段
// ==========================================
// Selected → Resolved → Classified → Computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    Configured, // 配置已加载并校验
    Selected,   // 已选表
    Resolved,   // 表头已解析
    Classified, // 币种已判定
    Computed,   // 价格已计算
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Configured => write!(f, "CONFIGURED"),
            PipelineStage::Selected => write!(f, "SELECTED"),
            PipelineStage::Resolved => write!(f, "RESOLVED"),
            PipelineStage::Classified => write!(f, "CLASSIFIED"),
            PipelineStage::Computed => write!(f, "COMPUTED"),
        }
    }
}
