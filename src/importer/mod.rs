// ==========================================
// 价格表导入与定价引擎 - 导入层
// ==========================================
// 职责: 工作簿读取 → 选表 → 表头解析 → 币种判定 → 产品记录
// 支持: Excel (.xlsx/.xlsm/.xls/.xlsb) / ODS / CSV
// ==========================================

// 模块声明
pub mod currency_classifier;
pub mod data_cleaner;
pub mod error;
pub mod file_parser;
pub mod header_resolver;
pub mod record_extractor;
pub mod sheet_selector;

// 重导出核心类型
pub use currency_classifier::{
    CurrencyClassification, CurrencyClassifier, CurrencyEvidence, MarkerSource,
};
pub use data_cleaner::DataCleaner;
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, UniversalFileParser};
pub use header_resolver::{HeaderResolver, Matcher, RolePattern, DEFAULT_PATTERNS};
pub use record_extractor::{ExtractionResult, RecordExtractor};
pub use sheet_selector::{SheetSelection, SheetSelector};
