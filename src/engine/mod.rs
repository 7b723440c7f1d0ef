// ==========================================
// 价格表导入与定价引擎 - 引擎层
// ==========================================
// 职责: 渠道价格计算 + 流水线编排
// 红线: 引擎不读文件、不拼 SQL，所有失败必须带原因上报
// ==========================================

pub mod error;
pub mod margin;
pub mod pipeline;
pub mod price_computer;

// 重导出核心引擎
pub use error::{PipelineError, PricingError};
pub use margin::{MarginFormula, MarginOnFinalPrice, MarkupOnBasePrice};
pub use pipeline::{
    FailedProduct, Pipeline, PipelineContext, PipelineOptions, PipelineOutput, SheetCandidate,
    SheetDiagnostics, SheetFailure, SheetReport,
};
pub use price_computer::{round_to, PriceComputer};
