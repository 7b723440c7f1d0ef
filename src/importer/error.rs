// ==========================================
// 价格表导入与定价引擎 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 范围: 文件读取 / 工作簿解析
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xlsm/.xls/.xlsb/.ods/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("工作簿无工作表: {0}")]
    EmptyWorkbook(String),

    // ===== 选表 / 表头错误 =====
    #[error("无可用工作表: 共 {} 张工作表均得分为 0 ({})", sheets.len(), sheets.join(", "))]
    NoUsableSheet { sheets: Vec<String> },

    #[error("工作表 {sheet} 缺少价格列 (表头行 {header_row})")]
    MissingPriceColumn { sheet: String, header_row: usize },

    #[error("等效型号表解析失败 (行 {row}): {message}")]
    EquivalenceParseError { row: usize, message: String },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
