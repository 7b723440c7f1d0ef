// ==========================================
// 价格表导入与定价引擎 - 流水线编排
// ==========================================
// 阶段: Configured → Selected → Resolved → Classified → Computed
// 规则:
// - 阶段性失败 fail-fast，不自动重试
// - 配置每次运行加载一次，并在选表前完成校验；来源与回退记录写入输出
// - 汇率按需获取：仅当选中的工作表为外币时请求，且单次运行内只请求一次
// - 单产品失败以 FailedProduct 上报，不中断整表
// - 多表模式下，表级失败记入 failed_sheets，其余工作表继续
// 红线: 输出不含时间戳 / 运行 ID，相同输入 → 相同 JSON
// ==========================================

use crate::config::error::ProviderAttempt;
use crate::config::provider::ConfigProvider;
use crate::config::validator::validate;
use crate::domain::pricing::{FxInfo, PricingConfig, ProductPricing};
use crate::domain::product::{HeaderMap, SkippedRow};
use crate::domain::types::{CanonicalRole, FxPolicy, PipelineStage, SelectionMode};
use crate::domain::workbook::Workbook;
use crate::engine::error::PipelineError;
use crate::engine::price_computer::PriceComputer;
use crate::equivalence::{EquivalenceMatcher, NoEquivalences};
use crate::fx::provider::FxProvider;
use crate::importer::currency_classifier::{
    CurrencyClassification, CurrencyClassifier, DEFAULT_SCAN_ROWS,
};
use crate::importer::header_resolver::HeaderResolver;
use crate::importer::record_extractor::RecordExtractor;
use crate::importer::sheet_selector::{
    no_usable_sheet, pick_best, usable_sheets, SheetSelection, SheetSelector,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// PipelineOptions - 运行选项
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOptions {
    pub selection_mode: SelectionMode,
    pub fx_policy: FxPolicy,
    pub currency_scan_rows: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            selection_mode: SelectionMode::Single,
            fx_policy: FxPolicy::Convert,
            currency_scan_rows: DEFAULT_SCAN_ROWS,
        }
    }
}

// ==========================================
// PipelineContext - 显式依赖（替代全局单例）
// ==========================================
#[derive(Clone)]
pub struct PipelineContext {
    pub config_provider: Arc<dyn ConfigProvider>,
    pub fx_provider: Arc<dyn FxProvider>,
    pub equivalences: Arc<dyn EquivalenceMatcher>,
    pub options: PipelineOptions,
}

impl PipelineContext {
    pub fn new(config_provider: Arc<dyn ConfigProvider>, fx_provider: Arc<dyn FxProvider>) -> Self {
        Self {
            config_provider,
            fx_provider,
            equivalences: Arc::new(NoEquivalences),
            options: PipelineOptions::default(),
        }
    }

    pub fn with_equivalences(mut self, equivalences: Arc<dyn EquivalenceMatcher>) -> Self {
        self.equivalences = equivalences;
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }
}

// ==========================================
// 输出结构
// ==========================================

/// 选表候选（含 0 分工作表）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetCandidate {
    pub sheet_index: usize,
    pub sheet_name: String,
    pub header_row: usize,
    pub data_rows: usize,
    pub score: u32,
}

impl From<&SheetSelection> for SheetCandidate {
    fn from(selection: &SheetSelection) -> Self {
        Self {
            sheet_index: selection.sheet_index,
            sheet_name: selection.sheet_name.clone(),
            header_row: selection.header_row,
            data_rows: selection.data_rows,
            score: selection.score,
        }
    }
}

/// 单表诊断信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetDiagnostics {
    pub sheet_index: usize,
    pub sheet_name: String,
    pub header_row: usize, // 0 起
    pub header_shift: usize,
    pub data_rows: usize,
    pub score: u32,
    pub header_map: HeaderMap,
    pub currency: CurrencyClassification,
}

/// 定价失败的产品（不静默丢弃）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedProduct {
    pub sheet_name: String,
    pub row_number: usize,
    pub model: String,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetReport {
    pub diagnostics: SheetDiagnostics,
    pub products: Vec<ProductPricing>,
    pub failed_products: Vec<FailedProduct>,
    pub skipped: Vec<SkippedRow>,
    pub warnings: Vec<String>,
    pub fx: Option<FxInfo>,
}

/// 多表模式下的表级失败
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetFailure {
    pub sheet_name: String,
    pub stage: PipelineStage,
    pub code: String,
    pub message: String,
}

impl SheetFailure {
    fn from_error(sheet_name: &str, err: &PipelineError) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            stage: err.stage(),
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub selection_mode: SelectionMode,
    pub fx_policy: FxPolicy,
    pub config: PricingConfig,
    pub config_source: String,
    pub config_attempts: Vec<ProviderAttempt>, // 回退前失败的配置来源
    pub candidates: Vec<SheetCandidate>,
    pub sheets: Vec<SheetReport>,
    pub failed_sheets: Vec<SheetFailure>,
}

impl PipelineOutput {
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    /// 成功定价的产品总数
    pub fn product_count(&self) -> usize {
        self.sheets.iter().map(|s| s.products.len()).sum()
    }
}

// ==========================================
// Pipeline
// ==========================================
pub struct Pipeline {
    context: PipelineContext,
    selector: SheetSelector,
    classifier: CurrencyClassifier,
    extractor: RecordExtractor,
    computer: PriceComputer,
}

impl Pipeline {
    pub fn new(context: PipelineContext) -> Self {
        Self {
            context,
            selector: SheetSelector::default(),
            classifier: CurrencyClassifier,
            extractor: RecordExtractor::default(),
            computer: PriceComputer::default(),
        }
    }

    /// 替换表头模式表
    pub fn with_header_resolver(mut self, resolver: HeaderResolver) -> Self {
        self.selector = SheetSelector::new(resolver);
        self
    }

    /// 替换价格计算器（如自定义毛利公式）
    pub fn with_price_computer(mut self, computer: PriceComputer) -> Self {
        self.computer = computer;
        self
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// 运行流水线
    ///
    /// # 返回
    /// - Ok(PipelineOutput): 至少完成选表；单产品失败记录在各表 failed_products 中
    /// - Err(PipelineError): 阶段性失败（通过 stage() 获取阶段）
    #[instrument(
        skip(self, workbook),
        fields(run_id = %Uuid::new_v4(), sheets = workbook.sheets.len())
    )]
    pub async fn run(&self, workbook: &Workbook) -> Result<PipelineOutput, PipelineError> {
        let options = self.context.options;

        // ===== Configured =====
        let loaded = self.context.config_provider.load().await?;
        validate(&loaded.config)?;
        let config = loaded.config;
        if !loaded.attempts.is_empty() {
            warn!(
                source = %loaded.source,
                failed = ?loaded.attempts,
                "定价参数来自回退来源"
            );
        }
        debug!(
            stage = %PipelineStage::Configured,
            source = %loaded.source,
            channels = ?config.channel_order(),
            "定价参数已校验"
        );

        // ===== Selected =====
        let scores = self.selector.score_all(workbook);
        let selections = match options.selection_mode {
            SelectionMode::Single => {
                let best = pick_best(&scores).ok_or_else(|| no_usable_sheet(workbook))?;
                vec![best.clone()]
            }
            SelectionMode::Multi => {
                let usable = usable_sheets(&scores);
                if usable.is_empty() {
                    return Err(no_usable_sheet(workbook).into());
                }
                usable
            }
        };
        info!(
            stage = %PipelineStage::Selected,
            selected = ?selections.iter().map(|s| s.sheet_name.as_str()).collect::<Vec<_>>(),
            "工作表已选定"
        );

        let mut fx_memo: Option<Option<FxInfo>> = None;
        let mut sheets = Vec::with_capacity(selections.len());
        let mut failed_sheets = Vec::new();

        for selection in &selections {
            match self
                .process_sheet(workbook, selection, &config, &mut fx_memo)
                .await
            {
                Ok(report) => sheets.push(report),
                Err(e) if options.selection_mode == SelectionMode::Multi => {
                    warn!(sheet = %selection.sheet_name, stage = %e.stage(), error = %e, "工作表处理失败");
                    failed_sheets.push(SheetFailure::from_error(&selection.sheet_name, &e));
                }
                Err(e) => return Err(e),
            }
        }

        let output = PipelineOutput {
            selection_mode: options.selection_mode,
            fx_policy: options.fx_policy,
            config,
            config_source: loaded.source,
            config_attempts: loaded.attempts,
            candidates: scores.iter().map(SheetCandidate::from).collect(),
            sheets,
            failed_sheets,
        };
        info!(
            stage = %PipelineStage::Computed,
            products = output.product_count(),
            failed_sheets = output.failed_sheets.len(),
            "流水线完成"
        );
        Ok(output)
    }

    async fn process_sheet(
        &self,
        workbook: &Workbook,
        selection: &SheetSelection,
        config: &PricingConfig,
        fx_memo: &mut Option<Option<FxInfo>>,
    ) -> Result<SheetReport, PipelineError> {
        let options = self.context.options;
        let Some(sheet) = workbook.sheet(selection.sheet_index) else {
            return Err(PipelineError::NoUsableSheet {
                sheets: vec![selection.sheet_name.clone()],
            });
        };

        // ===== Resolved =====
        if !selection.header_map.has(CanonicalRole::Price) {
            return Err(PipelineError::MissingPriceColumn {
                sheet: sheet.name.clone(),
                header_row: selection.header_row + 1,
            });
        }

        // ===== Classified =====
        let classification = self.classifier.classify(sheet, options.currency_scan_rows);
        let mut warnings = Vec::new();
        let mut fx = None;

        if classification.is_foreign_currency {
            if !options.fx_policy.conversion_enabled() {
                return Err(PipelineError::ForeignCurrencyRejected {
                    sheet: sheet.name.clone(),
                });
            }

            if fx_memo.is_none() {
                *fx_memo = Some(self.context.fx_provider.get_rate().await);
            }
            fx = fx_memo.clone().flatten();

            if fx.is_none() {
                if options.fx_policy.conversion_mandatory() {
                    return Err(PipelineError::FxUnavailable {
                        sheet: sheet.name.clone(),
                    });
                }
                warnings.push("外币报价无可用汇率，价格按外币原值计算".to_string());
            }
        }
        debug!(
            stage = %PipelineStage::Classified,
            sheet = %sheet.name,
            foreign = classification.is_foreign_currency,
            "币种已判定"
        );

        // ===== Computed =====
        let extraction = self
            .extractor
            .extract(sheet, selection, classification.unit())?;

        let mut products = Vec::with_capacity(extraction.records.len());
        let mut failed_products = Vec::new();
        for record in &extraction.records {
            let equivalence = self.context.equivalences.lookup(&record.model);
            match self.computer.compute(
                record,
                config,
                fx.as_ref(),
                equivalence.as_ref(),
                options.fx_policy,
            ) {
                Ok(pricing) => products.push(pricing),
                Err(e) => {
                    warn!(sheet = %record.sheet_name, row = record.row_number, error = %e, "产品定价失败");
                    failed_products.push(FailedProduct {
                        sheet_name: record.sheet_name.clone(),
                        row_number: record.row_number,
                        model: record.model.clone(),
                        code: e.code().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(SheetReport {
            diagnostics: SheetDiagnostics {
                sheet_index: selection.sheet_index,
                sheet_name: selection.sheet_name.clone(),
                header_row: selection.header_row,
                header_shift: selection.header_shift,
                data_rows: selection.data_rows,
                score: selection.score,
                header_map: selection.header_map.clone(),
                currency: classification,
            },
            products,
            failed_products,
            skipped: extraction.skipped,
            warnings,
            fx,
        })
    }
}
