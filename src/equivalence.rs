// ==========================================
// 价格表导入与定价引擎 - 等效型号匹配
// ==========================================
// 职责: 型号 → 等效型号 / 品牌 / 容量（Ah），用于容量系数调整
// 规则: 型号按规范化编码匹配（大写，去空白与 - _ . /）
// 数据: CSV 表头 model,equivalent,brand,capacity_ah
// ==========================================

use crate::domain::pricing::EquivalenceRecord;
use crate::importer::error::{ImportError, ImportResult};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

pub trait EquivalenceMatcher: Send + Sync {
    fn lookup(&self, model: &str) -> Option<EquivalenceRecord>;
}

/// 不做等效匹配（容量调整关闭）
pub struct NoEquivalences;

impl EquivalenceMatcher for NoEquivalences {
    fn lookup(&self, _model: &str) -> Option<EquivalenceRecord> {
        None
    }
}

/// 规范化型号编码
pub fn normalize_model_code(model: &str) -> String {
    model
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '_' | '.' | '/'))
        .flat_map(char::to_uppercase)
        .collect()
}

#[derive(Debug, Deserialize)]
struct EquivalenceRow {
    model: String,
    #[serde(default)]
    equivalent: Option<String>,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    capacity_ah: Option<String>,
}

/// "75" / "75Ah" / "75 ah" → 75
fn parse_capacity(raw: &str) -> Option<Result<u32, String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_lowercase();
    let digits = lower.strip_suffix("ah").unwrap_or(&lower).trim();
    Some(
        digits
            .parse::<u32>()
            .map_err(|_| format!("容量无法解析: {}", trimmed)),
    )
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ==========================================
// InMemoryEquivalenceMatcher
// ==========================================
#[derive(Debug, Default)]
pub struct InMemoryEquivalenceMatcher {
    records: HashMap<String, EquivalenceRecord>,
}

impl InMemoryEquivalenceMatcher {
    /// 重复型号保留首条
    pub fn from_records(records: Vec<EquivalenceRecord>) -> Self {
        let mut map = HashMap::with_capacity(records.len());
        for record in records {
            let code = normalize_model_code(&record.model_code);
            if code.is_empty() {
                continue;
            }
            if map.contains_key(&code) {
                warn!(model = %record.model_code, "等效型号重复，保留首条");
                continue;
            }
            map.insert(code, record);
        }
        Self { records: map }
    }

    /// 从 CSV 文件加载
    ///
    /// # 返回
    /// - Err(EquivalenceParseError): 行号为文件行号（表头为第 1 行）
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut records = Vec::new();
        for (idx, result) in reader.deserialize::<EquivalenceRow>().enumerate() {
            let row_number = idx + 2;
            let row = result.map_err(|e| ImportError::EquivalenceParseError {
                row: row_number,
                message: e.to_string(),
            })?;

            let capacity_ah = match row.capacity_ah.as_deref().and_then(parse_capacity) {
                Some(Ok(ah)) => Some(ah),
                Some(Err(message)) => {
                    return Err(ImportError::EquivalenceParseError {
                        row: row_number,
                        message,
                    })
                }
                None => None,
            };

            records.push(EquivalenceRecord {
                model_code: row.model.trim().to_string(),
                equivalent_model: non_blank(row.equivalent),
                brand: non_blank(row.brand),
                capacity_ah,
            });
        }

        let matcher = Self::from_records(records);
        info!(path = %path.display(), models = matcher.len(), "等效型号表加载完成");
        Ok(matcher)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl EquivalenceMatcher for InMemoryEquivalenceMatcher {
    fn lookup(&self, model: &str) -> Option<EquivalenceRecord> {
        self.records.get(&normalize_model_code(model)).cloned()
    }
}
