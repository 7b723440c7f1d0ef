// ==========================================
// 价格表导入与定价引擎 - 核心库
// ==========================================
// 系统定位: 异构报价表 → 归一化产品 → 多渠道价格
// 技术栈: Rust + calamine/csv + SQLite
// 红线: 宁可可诊断地失败，也不静默输出错误价格
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 工作簿 / 产品 / 定价类型
pub mod domain;

// 导入层 - 工作簿读取、选表、表头、币种
pub mod importer;

// 引擎层 - 价格计算与流水线
pub mod engine;

// 配置层 - 定价参数来源
pub mod config;

// 汇率层 - 实时来源 / 缓存 / 持久化降级
pub mod fx;

// 等效型号匹配
pub mod equivalence;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CanonicalRole, CurrencyUnit, FxPolicy, PipelineStage, SelectionMode};

// 领域实体
pub use domain::{
    Cell, ChannelOutcome, EquivalenceRecord, FxInfo, HeaderMap, PriceResult, PricingConfig,
    ProductPricing, ProductRecord, Sheet, SkippedRow, Workbook,
};

// 引擎
pub use engine::{
    Pipeline, PipelineContext, PipelineError, PipelineOptions, PipelineOutput, PriceComputer,
    PricingError,
};

// 导入
pub use importer::{
    CurrencyClassifier, HeaderResolver, ImportError, SheetSelection, SheetSelector,
    UniversalFileParser,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "价格表导入与定价引擎";
