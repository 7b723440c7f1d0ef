// ==========================================
// 流水线集成测试
// ==========================================
// 覆盖: 选表 → 表头 → 币种 → 定价 全链路，以及各阶段的失败上报
// ==========================================


use async_trait::async_trait;
use price_list_engine::config::{ConfigError, StaticConfigProvider};
use price_list_engine::domain::SkipReason;
use price_list_engine::equivalence::InMemoryEquivalenceMatcher;
use price_list_engine::fx::{FxProvider, StaticFxProvider};
use price_list_engine::{
    logging, Cell, ChannelOutcome, EquivalenceRecord, FxInfo, FxPolicy, Pipeline, PipelineContext,
    PipelineError, PipelineOptions, PipelineStage, SelectionMode, Sheet,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use test_helpers::{
    local_prices, price_sheet, product_row, reference_config, static_context, text_row,
    usd_prices, usd_sheet, workbook, HEADERS,
};

fn options(selection_mode: SelectionMode, fx_policy: FxPolicy) -> PipelineOptions {
    PipelineOptions {
        selection_mode,
        fx_policy,
        ..PipelineOptions::default()
    }
}

fn summary_sheet() -> Sheet {
    Sheet::new("Resumen", vec![text_row(&["Resumen", "Octubre"])])
}

fn final_price(pricing: &price_list_engine::ProductPricing, channel: &str) -> f64 {
    pricing
        .channel(channel)
        .and_then(ChannelOutcome::result)
        .map(|r| r.final_price)
        .expect("渠道应成功定价")
}

/// 计数汇率来源（验证单次运行只请求一次）
struct CountingFxProvider {
    calls: AtomicUsize,
    sell: Option<f64>,
}

impl CountingFxProvider {
    fn new(sell: Option<f64>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            sell,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FxProvider for CountingFxProvider {
    async fn get_rate(&self) -> Option<FxInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sell.map(|sell| FxInfo {
            buy: sell,
            sell,
            date: "2026-10-19".to_string(),
            source: "counting".to_string(),
        })
    }
}

// ==========================================
// 成功路径
// ==========================================

#[tokio::test]
async fn test_reference_price_end_to_end() {
    logging::init_test();
    let wb = workbook(vec![summary_sheet(), price_sheet("Lista Octubre", &local_prices())]);
    let context = static_context(reference_config(), None, PipelineOptions::default());

    let output = Pipeline::new(context).run(&wb).await.expect("流水线应成功");

    assert_eq!(output.candidates.len(), 2);
    assert_eq!(output.candidates[0].score, 0);
    assert!(output.candidates[1].score > 0);

    assert_eq!(output.sheets.len(), 1);
    let report = &output.sheets[0];
    assert_eq!(report.diagnostics.sheet_name, "Lista Octubre");
    assert_eq!(report.diagnostics.header_row, 0);
    assert!(!report.diagnostics.currency.is_foreign_currency);
    assert!(report.fx.is_none());
    assert_eq!(report.products.len(), 10);
    assert!(report.failed_products.is_empty());
    assert!(report.skipped.is_empty());

    let first = &report.products[0];
    assert_eq!(first.record.model, "M0");
    assert_eq!(first.record.row_number, 2);
    assert_eq!(first.record.brand.as_deref(), Some("Moura"));
    assert_eq!(first.resolved_base_price, 100000.0);
    assert_eq!(final_price(first, "direct"), 155001.0);

    let result = first.channel("direct").and_then(ChannelOutcome::result).unwrap();
    assert!((result.price_with_iva - 121000.0).abs() < 1e-6);
    assert!((result.price_with_markup - 147620.0).abs() < 1e-6);
    assert!((result.margin_pct - (155001.0 - 100000.0) / 155001.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_output_json_is_stable_across_runs() {
    let wb = workbook(vec![price_sheet("Lista", &local_prices())]);
    let pipeline = Pipeline::new(static_context(
        reference_config(),
        None,
        PipelineOptions::default(),
    ));

    let first = pipeline.run(&wb).await.unwrap().to_json(false).unwrap();
    let second = pipeline.run(&wb).await.unwrap().to_json(false).unwrap();
    assert_eq!(first, second);
    assert!(first.contains("\"final_price\":155001.0"));
}

#[tokio::test]
async fn test_tie_break_prefers_earlier_sheet() {
    let wb = workbook(vec![
        price_sheet("Enero", &local_prices()),
        price_sheet("Febrero", &local_prices()),
    ]);
    let context = static_context(reference_config(), None, PipelineOptions::default());

    let output = Pipeline::new(context).run(&wb).await.unwrap();
    assert_eq!(output.candidates[0].score, output.candidates[1].score);
    assert_eq!(output.sheets[0].diagnostics.sheet_name, "Enero");
}

#[tokio::test]
async fn test_title_row_above_header_is_ignored() {
    let mut rows = vec![
        text_row(&["LISTA DE PRECIOS", "", "", "", "", "Vigencia octubre"]),
        text_row(&HEADERS),
    ];
    for (i, price) in local_prices().iter().enumerate() {
        rows.push(product_row(&format!("B{}", i), Cell::number(*price)));
    }
    let wb = workbook(vec![Sheet::new("Lista", rows)]);
    let context = static_context(reference_config(), None, PipelineOptions::default());

    let output = Pipeline::new(context).run(&wb).await.unwrap();
    let report = &output.sheets[0];
    assert_eq!(report.diagnostics.header_row, 1);
    assert_eq!(report.products[0].record.row_number, 3);
    assert_eq!(final_price(&report.products[0], "direct"), 155001.0);
}

// ==========================================
// 阶段性失败
// ==========================================

#[tokio::test]
async fn test_no_usable_sheet() {
    let wb = workbook(vec![summary_sheet(), Sheet::new("Vacia", vec![])]);
    let context = static_context(reference_config(), None, PipelineOptions::default());

    let err = Pipeline::new(context).run(&wb).await.unwrap_err();
    assert!(matches!(err, PipelineError::NoUsableSheet { ref sheets } if sheets.len() == 2));
    assert_eq!(err.stage(), PipelineStage::Selected);
    assert_eq!(err.code(), "NO_USABLE_SHEET");
}

#[tokio::test]
async fn test_missing_price_column() {
    let mut rows = vec![text_row(&["Modelo", "Marca", "Descripción", "Rubro", "Unidad", "Stock"])];
    for i in 0..5 {
        rows.push(product_row(&format!("S{}", i), Cell::number(10.0 + i as f64)));
    }
    let wb = workbook(vec![Sheet::new("Inventario", rows)]);
    let context = static_context(reference_config(), None, PipelineOptions::default());

    let err = Pipeline::new(context).run(&wb).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::MissingPriceColumn { ref sheet, header_row: 1 } if sheet == "Inventario"
    ));
    assert_eq!(err.stage(), PipelineStage::Resolved);
    assert_eq!(err.sheet(), Some("Inventario"));
}

#[tokio::test]
async fn test_invalid_config_fails_before_selection() {
    let mut config = reference_config();
    config.iva = 150.0;
    // 工作簿本身无可用工作表: 配置错误必须先被报告
    let wb = workbook(vec![summary_sheet()]);
    let context = static_context(config, None, PipelineOptions::default());

    let err = Pipeline::new(context).run(&wb).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::ConfigInvalid(ConfigError::Invalid { ref field, .. }) if field == "iva"
    ));
    assert_eq!(err.stage(), PipelineStage::Configured);
}

// ==========================================
// 外币策略
// ==========================================

#[tokio::test]
async fn test_reject_policy_rejects_foreign_sheet() {
    let wb = workbook(vec![usd_sheet("Importados", &usd_prices())]);
    let context = static_context(
        reference_config(),
        Some(1000.0),
        options(SelectionMode::Single, FxPolicy::Reject),
    );

    let err = Pipeline::new(context).run(&wb).await.unwrap_err();
    assert!(matches!(err, PipelineError::ForeignCurrencyRejected { .. }));
    assert_eq!(err.stage(), PipelineStage::Classified);
}

#[tokio::test]
async fn test_convert_policy_without_rate_fails() {
    let wb = workbook(vec![usd_sheet("Importados", &usd_prices())]);
    let context = static_context(reference_config(), None, PipelineOptions::default());

    let err = Pipeline::new(context).run(&wb).await.unwrap_err();
    assert!(matches!(err, PipelineError::FxUnavailable { ref sheet } if sheet == "Importados"));
    assert_eq!(err.code(), "FX_UNAVAILABLE");
}

#[tokio::test]
async fn test_convert_policy_applies_sell_rate() {
    let wb = workbook(vec![usd_sheet("Importados", &usd_prices())]);
    let context = static_context(reference_config(), Some(1000.0), PipelineOptions::default());

    let output = Pipeline::new(context).run(&wb).await.unwrap();
    let report = &output.sheets[0];
    assert!(report.diagnostics.currency.is_foreign_currency);
    assert_eq!(report.fx.as_ref().map(|fx| fx.sell), Some(1000.0));

    let first = &report.products[0];
    assert_eq!(first.record.base_price, 100.0);
    assert_eq!(first.fx_rate_applied, Some(1000.0));
    assert_eq!(first.resolved_base_price, 100000.0);
    assert_eq!(final_price(first, "direct"), 155001.0);
}

#[tokio::test]
async fn test_convert_or_keep_prices_in_original_currency() {
    let wb = workbook(vec![usd_sheet("Importados", &usd_prices())]);
    let context = static_context(
        reference_config(),
        None,
        options(SelectionMode::Single, FxPolicy::ConvertOrKeep),
    );

    let output = Pipeline::new(context).run(&wb).await.unwrap();
    let report = &output.sheets[0];
    assert!(report.fx.is_none());
    assert!(!report.warnings.is_empty());

    let first = &report.products[0];
    assert_eq!(first.fx_rate_applied, None);
    assert_eq!(first.resolved_base_price, 100.0);
    assert!(!first.warnings.is_empty());
    // 100 × 1.21 × 1.22 × 1.05 = 155.001 → 155
    assert_eq!(final_price(first, "direct"), 155.0);
}

#[tokio::test]
async fn test_multi_sheet_records_sheet_failure() {
    let wb = workbook(vec![
        price_sheet("Baterias", &local_prices()),
        summary_sheet(),
        usd_sheet("Importados", &usd_prices()),
    ]);
    let context = static_context(
        reference_config(),
        None,
        options(SelectionMode::Multi, FxPolicy::Convert),
    );

    let output = Pipeline::new(context).run(&wb).await.unwrap();
    assert_eq!(output.selection_mode, SelectionMode::Multi);
    assert_eq!(output.candidates.len(), 3);
    assert_eq!(output.sheets.len(), 1);
    assert_eq!(output.sheets[0].diagnostics.sheet_name, "Baterias");
    assert_eq!(output.product_count(), 10);

    assert_eq!(output.failed_sheets.len(), 1);
    let failure = &output.failed_sheets[0];
    assert_eq!(failure.sheet_name, "Importados");
    assert_eq!(failure.code, "FX_UNAVAILABLE");
    assert_eq!(failure.stage, PipelineStage::Classified);
}

#[tokio::test]
async fn test_fx_requested_once_per_run() {
    let fx = Arc::new(CountingFxProvider::new(Some(1000.0)));
    let context = PipelineContext::new(
        Arc::new(StaticConfigProvider::new(reference_config())),
        fx.clone(),
    )
    .with_options(options(SelectionMode::Multi, FxPolicy::Convert));
    let wb = workbook(vec![
        usd_sheet("Importados A", &usd_prices()),
        usd_sheet("Importados B", &usd_prices()),
    ]);

    let output = Pipeline::new(context).run(&wb).await.unwrap();
    assert_eq!(output.sheets.len(), 2);
    assert_eq!(fx.calls(), 1);
}

#[tokio::test]
async fn test_fx_not_requested_for_local_sheets() {
    let fx = Arc::new(CountingFxProvider::new(Some(1000.0)));
    let context = PipelineContext::new(
        Arc::new(StaticConfigProvider::new(reference_config())),
        fx.clone(),
    );
    let wb = workbook(vec![price_sheet("Lista", &local_prices())]);

    Pipeline::new(context).run(&wb).await.unwrap();
    assert_eq!(fx.calls(), 0);
}

#[tokio::test]
async fn test_unusable_static_rate_counts_as_unavailable() {
    let context = PipelineContext::new(
        Arc::new(StaticConfigProvider::new(reference_config())),
        Arc::new(StaticFxProvider::with_sell(0.0)),
    );
    let wb = workbook(vec![usd_sheet("Importados", &usd_prices())]);

    let err = Pipeline::new(context).run(&wb).await.unwrap_err();
    assert!(matches!(err, PipelineError::FxUnavailable { .. }));
}

// ==========================================
// 行级诊断
// ==========================================

#[tokio::test]
async fn test_skipped_rows_and_failed_products_are_reported() {
    let mut rows = vec![text_row(&HEADERS)];
    for (i, price) in local_prices().iter().take(6).enumerate() {
        rows.push(product_row(&format!("M{}", i), Cell::number(*price)));
    }
    rows.push(product_row("CONSULTA", Cell::text("consultar"))); // 第 8 行
    rows.push(product_row("", Cell::number(120000.0))); // 第 9 行
    rows.push(vec![Cell::empty(); 6]); // 空行，静默跳过
    rows.push(product_row("NEG", Cell::number(-5.0))); // 第 11 行
    rows.push(product_row("TXT", Cell::text("$ 130.000,50"))); // 第 12 行
    let wb = workbook(vec![Sheet::new("Lista", rows)]);
    let context = static_context(reference_config(), None, PipelineOptions::default());

    let output = Pipeline::new(context).run(&wb).await.unwrap();
    let report = &output.sheets[0];

    assert_eq!(report.products.len(), 7);
    let txt = report
        .products
        .iter()
        .find(|p| p.record.model == "TXT")
        .expect("文本价格应被解析");
    assert_eq!(txt.record.base_price, 130000.5);

    assert_eq!(report.skipped.len(), 2);
    assert_eq!(report.skipped[0].row_number, 8);
    assert!(matches!(
        report.skipped[0].reason,
        SkipReason::UnparseablePrice { ref text } if text == "consultar"
    ));
    assert_eq!(report.skipped[1].row_number, 9);
    assert_eq!(report.skipped[1].reason, SkipReason::MissingModel);

    assert_eq!(report.failed_products.len(), 1);
    let failed = &report.failed_products[0];
    assert_eq!(failed.model, "NEG");
    assert_eq!(failed.row_number, 11);
    assert_eq!(failed.code, "INVALID_BASE_PRICE");
}

#[tokio::test]
async fn test_missing_channel_commission_defaults_to_zero() {
    let mut config = reference_config();
    config.channels.push("mayorista".to_string());
    config.markups.insert("mayorista".to_string(), 10.0);
    let wb = workbook(vec![price_sheet("Lista", &local_prices())]);

    let output = Pipeline::new(static_context(config, None, PipelineOptions::default()))
        .run(&wb)
        .await
        .unwrap();
    let first = &output.sheets[0].products[0];
    assert_eq!(first.channels.len(), 2);
    assert_eq!(final_price(first, "direct"), 155001.0);
    // 缺省佣金视为 0: 100000 × 1.21 × 1.10
    assert_eq!(final_price(first, "mayorista"), 133100.0);
}

#[tokio::test]
async fn test_missing_channel_markup_fails_whole_run() {
    let mut config = reference_config();
    config.channels.push("mayorista".to_string());
    config.commissions.insert("mayorista".to_string(), 3.0);
    let wb = workbook(vec![price_sheet("Lista", &local_prices())]);

    let err = Pipeline::new(static_context(config, None, PipelineOptions::default()))
        .run(&wb)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::ConfigInvalid(ConfigError::Invalid { ref field, .. })
            if field == "markup/mayorista"
    ));
    assert_eq!(err.stage(), PipelineStage::Configured);
}

#[tokio::test]
async fn test_out_of_range_channel_markup_fails_whole_run() {
    let mut config = reference_config();
    config.channels.push("mayorista".to_string());
    config.markups.insert("mayorista".to_string(), -5.0);
    let wb = workbook(vec![price_sheet("Lista", &local_prices())]);

    let err = Pipeline::new(static_context(config, None, PipelineOptions::default()))
        .run(&wb)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::ConfigInvalid(ConfigError::Invalid { ref field, .. })
            if field == "markup/mayorista"
    ));
}

#[tokio::test]
async fn test_equivalence_applies_capacity_factor() {
    let mut config = reference_config();
    config.capacity_factors.insert(75, 10.0);
    let matcher = InMemoryEquivalenceMatcher::from_records(vec![EquivalenceRecord {
        model_code: "M-0".to_string(),
        equivalent_model: Some("12X75".to_string()),
        brand: Some("Moura".to_string()),
        capacity_ah: Some(75),
    }]);
    let context = static_context(config, None, PipelineOptions::default())
        .with_equivalences(Arc::new(matcher));
    let wb = workbook(vec![price_sheet("Lista", &local_prices())]);

    let output = Pipeline::new(context).run(&wb).await.unwrap();
    let products = &output.sheets[0].products;

    assert_eq!(products[0].capacity_factor_applied, Some(10.0));
    assert!((products[0].resolved_base_price - 110000.0).abs() < 1e-6);
    assert_eq!(products[1].capacity_factor_applied, None);
    assert_eq!(products[1].resolved_base_price, 110000.0);
}
