// ==========================================
// 价格表导入与定价引擎 - 命令行入口
// ==========================================
// 用法:
//   price-list-engine lista.xlsx --config pricing.json --fx-url https://... --pretty
// 配置来源顺序: SQLite (config_kv) → JSON 文件 → 内置默认值
// 输出: stdout 为 JSON 结果，日志写 stderr
// ==========================================

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use price_list_engine::config::{
    ConfigProvider, ConfigProviderChain, JsonFileConfigProvider, SqliteConfigProvider,
    StaticConfigProvider,
};
use price_list_engine::db::get_default_db_path;
use price_list_engine::equivalence::{EquivalenceMatcher, InMemoryEquivalenceMatcher, NoEquivalences};
use price_list_engine::fx::{
    CachedFxProvider, FxProvider, HttpFxSource, SqliteFxRateStore, StaticFxProvider,
};
use price_list_engine::logging::{self, LogFormat};
use price_list_engine::{FxPolicy, Pipeline, PipelineContext, PipelineOptions, SelectionMode};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FxPolicyArg {
    Reject,
    Convert,
    ConvertOrKeep,
}

impl From<FxPolicyArg> for FxPolicy {
    fn from(arg: FxPolicyArg) -> Self {
        match arg {
            FxPolicyArg::Reject => FxPolicy::Reject,
            FxPolicyArg::Convert => FxPolicy::Convert,
            FxPolicyArg::ConvertOrKeep => FxPolicy::ConvertOrKeep,
        }
    }
}

/// 价格表导入与多渠道定价
#[derive(Parser, Debug)]
#[command(name = "price-list-engine", version, about = "价格表导入与多渠道定价引擎")]
struct Args {
    /// 价格表文件（.xlsx/.xlsm/.xls/.xlsb/.ods/.csv）
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// 定价参数 JSON 文件
    #[arg(long, value_name = "JSON")]
    config: Option<PathBuf>,

    /// SQLite 数据库（config_kv / fx_rate_history），默认取 PRICE_LIST_ENGINE_DB_PATH
    #[arg(long, value_name = "SQLITE")]
    db: Option<PathBuf>,

    /// 处理所有可用工作表
    #[arg(long)]
    multi_sheet: bool,

    /// 外币换算策略
    #[arg(long, value_enum, default_value = "convert")]
    fx_policy: FxPolicyArg,

    /// 汇率接口地址（返回 {compra, venta, fechaActualizacion}）
    #[arg(long, value_name = "URL")]
    fx_url: Option<String>,

    /// 固定汇率（卖出价），与 --fx-url 互斥
    #[arg(long, value_name = "RATE", conflicts_with = "fx_url")]
    fx_rate: Option<f64>,

    /// 等效型号 CSV（model,equivalent,brand,capacity_ah）
    #[arg(long, value_name = "CSV")]
    equivalences: Option<PathBuf>,

    /// 格式化输出 JSON
    #[arg(long)]
    pretty: bool,

    /// 日志以 JSON 行输出
    #[arg(long)]
    log_json: bool,
}

/// 已存在的数据库路径
fn existing_db_path(args: &Args) -> Option<String> {
    let path = args
        .db
        .clone()
        .unwrap_or_else(|| PathBuf::from(get_default_db_path()));
    if path.exists() {
        Some(path.to_string_lossy().to_string())
    } else {
        tracing::info!(path = %path.display(), "数据库不存在，跳过 SQLite 配置来源");
        None
    }
}

fn build_config_provider(args: &Args, db_path: Option<&str>) -> Arc<dyn ConfigProvider> {
    let mut chain = ConfigProviderChain::new();
    if let Some(path) = db_path {
        match SqliteConfigProvider::new(path) {
            Ok(provider) => chain = chain.with_provider(Arc::new(provider)),
            Err(e) => tracing::warn!(error = %e, "SQLite 配置来源不可用"),
        }
    }
    if let Some(path) = &args.config {
        chain = chain.with_provider(Arc::new(JsonFileConfigProvider::new(path)));
    }
    Arc::new(chain.with_provider(Arc::new(StaticConfigProvider::defaults())))
}

fn build_fx_provider(args: &Args, db_path: Option<&str>) -> Result<Arc<dyn FxProvider>> {
    if let Some(rate) = args.fx_rate {
        return Ok(Arc::new(StaticFxProvider::with_sell(rate)));
    }
    let Some(url) = &args.fx_url else {
        return Ok(Arc::new(StaticFxProvider::unavailable()));
    };

    let source = HttpFxSource::new(url.clone()).context("汇率客户端初始化失败")?;
    let mut provider = CachedFxProvider::new(Arc::new(source));
    if let Some(path) = db_path {
        match SqliteFxRateStore::new(path) {
            Ok(store) => provider = provider.with_store(Arc::new(store)),
            Err(e) => tracing::warn!(error = %e, "汇率持久化不可用"),
        }
    }
    Ok(Arc::new(provider))
}

fn build_equivalences(path: Option<&Path>) -> Result<Arc<dyn EquivalenceMatcher>> {
    match path {
        Some(path) => {
            let matcher = InMemoryEquivalenceMatcher::from_csv_path(path)
                .with_context(|| format!("等效型号表加载失败: {}", path.display()))?;
            Ok(Arc::new(matcher))
        }
        None => Ok(Arc::new(NoEquivalences)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init(LogFormat::from_json_flag(args.log_json));
    tracing::info!("{} v{}", price_list_engine::APP_NAME, price_list_engine::VERSION);

    let workbook = price_list_engine::UniversalFileParser
        .parse(&args.file)
        .with_context(|| format!("工作簿加载失败: {}", args.file.display()))?;

    let db_path = existing_db_path(&args);
    let options = PipelineOptions {
        selection_mode: if args.multi_sheet {
            SelectionMode::Multi
        } else {
            SelectionMode::Single
        },
        fx_policy: args.fx_policy.into(),
        ..PipelineOptions::default()
    };

    let context = PipelineContext::new(
        build_config_provider(&args, db_path.as_deref()),
        build_fx_provider(&args, db_path.as_deref())?,
    )
    .with_equivalences(build_equivalences(args.equivalences.as_deref())?)
    .with_options(options);

    let output = match Pipeline::new(context).run(&workbook).await {
        Ok(output) => output,
        Err(e) => {
            tracing::error!(stage = %e.stage(), code = e.code(), error = %e, "流水线失败");
            anyhow::bail!("[{}] {}", e.code(), e);
        }
    };

    println!("{}", output.to_json(args.pretty)?);
    Ok(())
}
