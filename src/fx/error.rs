// ==========================================
// 价格表导入与定价引擎 - 汇率层错误类型
// ==========================================
// 说明: FxProvider 对外只返回 Option<FxInfo>，
//       FxError 用于来源 / 存储内部的失败记录与日志
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FxError {
    #[error("汇率接口请求失败: {0}")]
    Http(String),

    #[error("汇率接口返回异常状态 {status}: {url}")]
    Status { status: u16, url: String },

    #[error("汇率报文解析失败: {0}")]
    Parse(String),

    #[error("汇率不可用: 卖出价 {sell}")]
    InvalidRate { sell: f64 },

    #[error("汇率获取超时 ({timeout_ms} ms)")]
    Timeout { timeout_ms: u64 },

    #[error("汇率存储读写失败: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for FxError {
    fn from(err: reqwest::Error) -> Self {
        FxError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for FxError {
    fn from(err: serde_json::Error) -> Self {
        FxError::Parse(err.to_string())
    }
}

impl From<rusqlite::Error> for FxError {
    fn from(err: rusqlite::Error) -> Self {
        FxError::Storage(err.to_string())
    }
}

/// Result 类型别名
pub type FxResult<T> = Result<T, FxError>;
