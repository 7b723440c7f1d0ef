// ==========================================
// 价格表导入与定价引擎 - 产品记录提取器
// ==========================================
// 职责: 表头行之后的数据行 → ProductRecord / SkippedRow
// 红线:
// - price / model 均非空才生成 ProductRecord
// - 失败行必须以 SkippedRow 形式上报，不能静默丢弃
// - 完全空白的行不是产品，直接忽略
// ==========================================

use crate::domain::product::{HeaderMap, ProductRecord, SkipReason, SkippedRow};
use crate::domain::types::{CanonicalRole, CurrencyUnit};
use crate::domain::workbook::{CellValue, Sheet};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::sheet_selector::SheetSelection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub records: Vec<ProductRecord>,
    pub skipped: Vec<SkippedRow>,
}

pub struct RecordExtractor {
    cleaner: DataCleaner,
}

impl Default for RecordExtractor {
    fn default() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }
}

impl RecordExtractor {
    /// 提取产品记录
    ///
    /// # 返回
    /// - Err(MissingPriceColumn): 价格角色未解析
    /// - Ok(ExtractionResult): 有效记录 + 跳过行
    pub fn extract(
        &self,
        sheet: &Sheet,
        selection: &SheetSelection,
        currency: CurrencyUnit,
    ) -> ImportResult<ExtractionResult> {
        let header_map = &selection.header_map;
        let price_col = header_map.column(CanonicalRole::Price).ok_or_else(|| {
            ImportError::MissingPriceColumn {
                sheet: sheet.name.clone(),
                header_row: selection.header_row + 1,
            }
        })?;

        let width = sheet.width();
        let mut result = ExtractionResult::default();
        for row_idx in (selection.header_row + 1)..sheet.row_count() {
            let raw = sheet.row_texts_padded(row_idx, width);
            if raw.iter().all(|t| t.trim().is_empty()) {
                continue;
            }
            let row_number = row_idx + 1;

            let skip = |field: CanonicalRole, reason: SkipReason| SkippedRow {
                sheet_name: sheet.name.clone(),
                row_number,
                field,
                reason,
                raw: raw.clone(),
            };

            let model = match self.role_text(&raw, header_map, CanonicalRole::Model) {
                Some(model) => model,
                None => {
                    result.skipped.push(skip(CanonicalRole::Model, SkipReason::MissingModel));
                    continue;
                }
            };

            let base_price = match self.parse_price(sheet, row_idx, price_col) {
                Ok(price) => price,
                Err(reason) => {
                    result.skipped.push(skip(CanonicalRole::Price, reason));
                    continue;
                }
            };

            result.records.push(ProductRecord {
                sheet_name: sheet.name.clone(),
                row_number,
                model,
                brand: self.role_text(&raw, header_map, CanonicalRole::Brand),
                description: self.role_text(&raw, header_map, CanonicalRole::Description),
                category: self.role_text(&raw, header_map, CanonicalRole::Category),
                base_price,
                currency,
                raw,
            });
        }

        for skipped in &result.skipped {
            debug!(
                sheet = %skipped.sheet_name,
                row = skipped.row_number,
                field = %skipped.field,
                reason = %skipped.reason,
                "数据行跳过"
            );
        }
        info!(
            sheet = %sheet.name,
            records = result.records.len(),
            skipped = result.skipped.len(),
            "产品记录提取完成"
        );
        Ok(result)
    }

    fn role_text(&self, raw: &[String], map: &HeaderMap, role: CanonicalRole) -> Option<String> {
        let col = map.column(role)?;
        self.cleaner.normalize_null(raw.get(col).cloned())
    }

    /// 价格单元格 → 数值（数值单元格直接取值，文本单元格按本地格式解析）
    fn parse_price(&self, sheet: &Sheet, row: usize, col: usize) -> Result<f64, SkipReason> {
        let Some(cell) = sheet.cell(row, col) else {
            return Err(SkipReason::MissingPrice);
        };
        if cell.is_empty() {
            return Err(SkipReason::MissingPrice);
        }
        match &cell.value {
            CellValue::Number(n) => Ok(*n),
            _ => {
                let text = cell.display();
                self.cleaner
                    .parse_price_text(&text)
                    .ok_or(SkipReason::UnparseablePrice { text })
            }
        }
    }
}
