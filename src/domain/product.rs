// ==========================================
// 价格表导入与定价引擎 - 产品领域模型
// ==========================================
// 职责: 表头映射 / 产品记录 / 跳过行
// 生命周期: 单次流水线运行内
// ==========================================

use crate::domain::types::{CanonicalRole, CurrencyUnit, PricePriority};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ==========================================
// ResolvedColumn - 角色命中的列
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedColumn {
    pub index: usize,    // 列下标（0 起）
    pub header: String,  // 原始表头文本
    pub pattern: String, // 命中的模式
    pub priority: u8,    // 模式优先级（1 最高）
}

// ==========================================
// HeaderMap - 规范角色 → 列
// ==========================================
// 每张表独立构建；角色可以缺失
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HeaderMap {
    pub columns: BTreeMap<CanonicalRole, ResolvedColumn>,
}

impl HeaderMap {
    pub fn get(&self, role: CanonicalRole) -> Option<&ResolvedColumn> {
        self.columns.get(&role)
    }

    pub fn column(&self, role: CanonicalRole) -> Option<usize> {
        self.columns.get(&role).map(|c| c.index)
    }

    pub fn has(&self, role: CanonicalRole) -> bool {
        self.columns.contains_key(&role)
    }

    pub fn insert(&mut self, role: CanonicalRole, column: ResolvedColumn) {
        self.columns.insert(role, column);
    }

    /// 已解析角色数
    pub fn resolved_count(&self) -> usize {
        self.columns.len()
    }

    /// 价格列命中的优先级
    pub fn price_priority(&self) -> Option<PricePriority> {
        self.columns
            .get(&CanonicalRole::Price)
            .and_then(|c| PricePriority::from_level(c.priority))
    }

    pub fn is_column_claimed(&self, index: usize) -> bool {
        self.columns.values().any(|c| c.index == index)
    }
}

// ==========================================
// ProductRecord - 产品记录
// ==========================================
// 红线: 创建后不可变；价格结果单独存放在 ProductPricing
// 仅当 price / model 均非空时才会生成
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub sheet_name: String,
    pub row_number: usize, // 工作表行号（1 起，便于用户定位）
    pub raw: Vec<String>,  // 原始单元格文本

    pub model: String,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,

    pub base_price: f64,        // 表内原始价格（未换算）
    pub currency: CurrencyUnit, // 表的计价币种
}

// ==========================================
// SkipReason - 跳过原因
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    MissingModel,
    MissingPrice,
    UnparseablePrice { text: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingModel => write!(f, "型号为空"),
            SkipReason::MissingPrice => write!(f, "价格为空"),
            SkipReason::UnparseablePrice { text } => write!(f, "价格无法解析: {}", text),
        }
    }
}

// ==========================================
// SkippedRow - 未进入定价的行
// ==========================================
// 红线: 失败行不能静默丢弃
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub sheet_name: String,
    pub row_number: usize,
    pub field: CanonicalRole,
    pub reason: SkipReason,
    pub raw: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(index: usize, priority: u8) -> ResolvedColumn {
        ResolvedColumn {
            index,
            header: format!("h{}", index),
            pattern: "p".to_string(),
            priority,
        }
    }

    #[test]
    fn test_header_map_basic() {
        let mut map = HeaderMap::default();
        map.insert(CanonicalRole::Price, col(3, 2));
        map.insert(CanonicalRole::Model, col(0, 1));

        assert_eq!(map.resolved_count(), 2);
        assert_eq!(map.column(CanonicalRole::Price), Some(3));
        assert_eq!(map.price_priority(), Some(PricePriority::SaleOrList));
        assert!(map.is_column_claimed(0));
        assert!(!map.is_column_claimed(1));
        assert!(!map.has(CanonicalRole::Brand));
    }

    #[test]
    fn test_skip_reason_display() {
        let reason = SkipReason::UnparseablePrice {
            text: "consultar".to_string(),
        };
        assert_eq!(reason.to_string(), "价格无法解析: consultar");
    }
}
