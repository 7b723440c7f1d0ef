// ==========================================
// 价格表导入与定价引擎 - 领域模型层
// ==========================================
// 职责: 定义工作簿、产品、定价参数与结果类型
// 红线: 不含文件读取逻辑,不含定价计算逻辑
// ==========================================

pub mod pricing;
pub mod product;
pub mod types;
pub mod workbook;

// 重导出核心类型
pub use pricing::{
    ChannelOutcome, EquivalenceRecord, FxInfo, PriceResult, PricingConfig, ProductPricing,
};
pub use product::{HeaderMap, ProductRecord, ResolvedColumn, SkipReason, SkippedRow};
pub use types::{
    CanonicalRole, CurrencyUnit, FxPolicy, PipelineStage, PricePriority, SelectionMode,
};
pub use workbook::{Cell, CellValue, Sheet, Workbook};
