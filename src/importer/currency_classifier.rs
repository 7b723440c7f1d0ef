// ==========================================
// 价格表导入与定价引擎 - 币种判定器
// ==========================================
// 职责: 判定工作表价格是否以外币（美元）计价
// 步骤:
// 1. 文本信号: 单元格格式化文本 → 格式串 → 表名，命中美元记号即判定外币
// 2. 数值回退: 有限正数 ≥ 8 个，且 ≥ 60% 落在 [1, 500] 区间则判定外币
// 已知局限: 启发式判定，存在误判（如本币小额配件表），不视为缺陷
// ==========================================

use crate::domain::types::CurrencyUnit;
use crate::domain::workbook::Sheet;
use crate::importer::data_cleaner::fold_diacritic;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 默认扫描行数
pub const DEFAULT_SCAN_ROWS: usize = 20;
/// 数值回退所需的最少样本数
pub const MIN_NUMERIC_SAMPLES: usize = 8;
/// 小额价格区间（含端点）
pub const SMALL_PRICE_BAND: (f64, f64) = (1.0, 500.0);
/// 落入小额区间的比例阈值
pub const SMALL_PRICE_RATIO: f64 = 0.6;

/// 美元记号（匹配前已小写 + 去重音）
static USD_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\busd\b|u\$s|u\$d|us\$|\bdolar(?:es)?\b|\bdollars?\b|\[\$usd|\[\$\$-409\]|\[\$us\$)")
        .expect("美元记号正则非法")
});

// ==========================================
// 判定依据
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CurrencyEvidence {
    /// 文本记号命中
    TextMarker {
        source: MarkerSource,
        row: Option<usize>,
        col: Option<usize>,
        matched: String,
    },
    /// 数值区间统计
    NumericBand { in_band: usize, total: usize },
    /// 样本不足，默认本币
    InsufficientSamples { total: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarkerSource {
    CellText,
    CellFormat,
    SheetName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyClassification {
    pub is_foreign_currency: bool,
    pub evidence: CurrencyEvidence,
}

impl CurrencyClassification {
    pub fn unit(&self) -> CurrencyUnit {
        if self.is_foreign_currency {
            CurrencyUnit::Foreign
        } else {
            CurrencyUnit::Local
        }
    }
}

pub struct CurrencyClassifier;

impl CurrencyClassifier {
    /// 判定工作表币种
    ///
    /// # 参数
    /// - sheet: 工作表
    /// - max_rows: 扫描行数（默认 20）
    pub fn classify(&self, sheet: &Sheet, max_rows: usize) -> CurrencyClassification {
        if let Some(evidence) = self.find_text_marker(sheet, max_rows) {
            debug!(sheet = %sheet.name, ?evidence, "币种文本信号命中");
            return CurrencyClassification {
                is_foreign_currency: true,
                evidence,
            };
        }

        let values: Vec<f64> = sheet
            .rows
            .iter()
            .take(max_rows)
            .flat_map(|row| row.iter().filter_map(|c| c.positive_number()))
            .collect();

        let total = values.len();
        if total < MIN_NUMERIC_SAMPLES {
            debug!(sheet = %sheet.name, total, "数值样本不足，默认本币");
            return CurrencyClassification {
                is_foreign_currency: false,
                evidence: CurrencyEvidence::InsufficientSamples { total },
            };
        }

        let (low, high) = SMALL_PRICE_BAND;
        let in_band = values.iter().filter(|v| **v >= low && **v <= high).count();
        let is_foreign = (in_band as f64) >= SMALL_PRICE_RATIO * total as f64;
        debug!(sheet = %sheet.name, in_band, total, is_foreign, "币种数值回退判定");

        CurrencyClassification {
            is_foreign_currency: is_foreign,
            evidence: CurrencyEvidence::NumericBand { in_band, total },
        }
    }

    /// 文本信号扫描（格式化文本 → 格式串 → 表名）
    fn find_text_marker(&self, sheet: &Sheet, max_rows: usize) -> Option<CurrencyEvidence> {
        for (row_idx, row) in sheet.rows.iter().take(max_rows).enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                if let Some(matched) = match_marker(&cell.text) {
                    return Some(CurrencyEvidence::TextMarker {
                        source: MarkerSource::CellText,
                        row: Some(row_idx),
                        col: Some(col_idx),
                        matched,
                    });
                }
                if let Some(matched) = cell.format.as_deref().and_then(match_marker) {
                    return Some(CurrencyEvidence::TextMarker {
                        source: MarkerSource::CellFormat,
                        row: Some(row_idx),
                        col: Some(col_idx),
                        matched,
                    });
                }
            }
        }

        match_marker(&sheet.name).map(|matched| CurrencyEvidence::TextMarker {
            source: MarkerSource::SheetName,
            row: None,
            col: None,
            matched,
        })
    }
}

/// 匹配美元记号，返回命中的片段
pub fn match_marker(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }
    let folded: String = text.to_lowercase().chars().map(fold_diacritic).collect();
    USD_MARKER.find(&folded).map(|m| m.as_str().to_string())
}
