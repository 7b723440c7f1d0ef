// ==========================================
// 价格表导入与定价引擎 - 引擎层错误类型
// ==========================================
// 分层:
// - PricingError: 单个产品失败（流水线中以 FailedProduct 上报，不中断）
// - PipelineError: 阶段性失败（fail-fast，不自动重试）
// ==========================================

use crate::config::error::ConfigError;
use crate::domain::types::PipelineStage;
use crate::importer::error::ImportError;
use thiserror::Error;

// ==========================================
// PricingError - 单产品定价失败
// ==========================================
#[derive(Error, Debug)]
pub enum PricingError {
    #[error("外币报价被拒绝: 工作表 {sheet} 第 {row} 行")]
    ForeignCurrencyRejected { sheet: String, row: usize },

    #[error("基准价非法: 工作表 {sheet} 第 {row} 行, 值 {value} ({reason})")]
    InvalidBasePrice {
        sheet: String,
        row: usize,
        value: f64,
        reason: String,
    },

    #[error("定价参数非法: {0}")]
    ConfigInvalid(#[from] ConfigError),
}

impl PricingError {
    /// 稳定错误码（用于输出）
    pub fn code(&self) -> &'static str {
        match self {
            PricingError::ForeignCurrencyRejected { .. } => "FOREIGN_CURRENCY_REJECTED",
            PricingError::InvalidBasePrice { .. } => "INVALID_BASE_PRICE",
            PricingError::ConfigInvalid(_) => "CONFIG_INVALID",
        }
    }
}

// ==========================================
// PipelineError - 流水线阶段失败
// ==========================================
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("定价参数加载失败: {0}")]
    ConfigUnavailable(ConfigError),

    #[error("定价参数非法: {0}")]
    ConfigInvalid(ConfigError),

    #[error("无可用工作表: {}", sheets.join(", "))]
    NoUsableSheet { sheets: Vec<String> },

    #[error("工作表 {sheet} 缺少价格列 (表头行 {header_row})")]
    MissingPriceColumn { sheet: String, header_row: usize },

    #[error("工作表 {sheet} 为外币报价，当前策略拒绝换算")]
    ForeignCurrencyRejected { sheet: String },

    #[error("工作表 {sheet} 为外币报价，但无可用汇率")]
    FxUnavailable { sheet: String },

    #[error("导入失败: {0}")]
    Import(ImportError),
}

impl PipelineError {
    /// 失败发生的阶段
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::ConfigUnavailable(_) | PipelineError::ConfigInvalid(_) => {
                PipelineStage::Configured
            }
            PipelineError::NoUsableSheet { .. } | PipelineError::Import(_) => {
                PipelineStage::Selected
            }
            PipelineError::MissingPriceColumn { .. } => PipelineStage::Resolved,
            PipelineError::ForeignCurrencyRejected { .. } | PipelineError::FxUnavailable { .. } => {
                PipelineStage::Classified
            }
        }
    }

    /// 稳定错误码（用于输出与退出信息）
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::ConfigUnavailable(_) => "CONFIG_UNAVAILABLE",
            PipelineError::ConfigInvalid(_) => "CONFIG_INVALID",
            PipelineError::NoUsableSheet { .. } => "NO_USABLE_SHEET",
            PipelineError::MissingPriceColumn { .. } => "MISSING_PRICE_COLUMN",
            PipelineError::ForeignCurrencyRejected { .. } => "FOREIGN_CURRENCY_REJECTED",
            PipelineError::FxUnavailable { .. } => "FX_UNAVAILABLE",
            PipelineError::Import(_) => "IMPORT_FAILED",
        }
    }

    /// 相关工作表（阶段性失败时）
    pub fn sheet(&self) -> Option<&str> {
        match self {
            PipelineError::MissingPriceColumn { sheet, .. }
            | PipelineError::ForeignCurrencyRejected { sheet }
            | PipelineError::FxUnavailable { sheet } => Some(sheet),
            _ => None,
        }
    }
}

impl From<ConfigError> for PipelineError {
    fn from(err: ConfigError) -> Self {
        if matches!(err, ConfigError::Invalid { .. }) {
            PipelineError::ConfigInvalid(err)
        } else {
            PipelineError::ConfigUnavailable(err)
        }
    }
}

impl From<ImportError> for PipelineError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::NoUsableSheet { sheets } => PipelineError::NoUsableSheet { sheets },
            ImportError::MissingPriceColumn { sheet, header_row } => {
                PipelineError::MissingPriceColumn { sheet, header_row }
            }
            other => PipelineError::Import(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_mapping() {
        let err: PipelineError = ImportError::NoUsableSheet {
            sheets: vec!["A".to_string()],
        }
        .into();
        assert_eq!(err.stage(), PipelineStage::Selected);
        assert_eq!(err.code(), "NO_USABLE_SHEET");

        let err: PipelineError = ImportError::MissingPriceColumn {
            sheet: "Lista".to_string(),
            header_row: 3,
        }
        .into();
        assert_eq!(err.stage(), PipelineStage::Resolved);
        assert_eq!(err.sheet(), Some("Lista"));

        let err = PipelineError::FxUnavailable {
            sheet: "USD".to_string(),
        };
        assert_eq!(err.stage(), PipelineStage::Classified);
    }

    #[test]
    fn test_config_error_mapping() {
        let err: PipelineError = ConfigError::invalid("iva", 150, "超出范围").into();
        assert!(matches!(err, PipelineError::ConfigInvalid(_)));
        assert_eq!(err.stage(), PipelineStage::Configured);

        let err: PipelineError = ConfigError::NotFound {
            provider: "sqlite".to_string(),
        }
        .into();
        assert_eq!(err.code(), "CONFIG_UNAVAILABLE");
    }
}
