// ==========================================
// 价格表导入与定价引擎 - 日志初始化
// ==========================================
// 职责: 安装全局 tracing subscriber
// 规则:
// - 级别由 RUST_LOG 控制，未设置时本 crate 为 info，依赖库为 warn
// - 一律写 stderr，stdout 只承载流水线 JSON 结果
// - 文本格式供人读；JSON 行格式供日志采集（--log-json）
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// RUST_LOG 未设置时的过滤指令
const DEFAULT_DIRECTIVES: &str = "warn,price_list_engine=info";

/// stderr 日志格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// 安装全局 subscriber（进程内只能调用一次）
///
/// ```no_run
/// use price_list_engine::logging::{self, LogFormat};
/// logging::init(LogFormat::Text);
/// ```
pub fn init(format: LogFormat) {
    let builder = fmt().with_env_filter(env_filter()).with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.with_target(true).with_line_number(true).init(),
        // 每条事件一行，附带当前 span 字段（流水线运行 / 文件路径）
        LogFormat::Json => builder.json().with_current_span(true).init(),
    }
}

/// 测试用: debug 级别，经 test writer 输出，重复调用无副作用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
