// ==========================================
// 价格表导入与定价引擎 - 文件解析器实现
// ==========================================
// 职责: 物理文件 → 内存 Workbook
// 支持: Excel (.xlsx/.xlsm/.xls/.xlsb) / ODS / CSV
// 说明:
// - Excel 保留全部工作表及其顺序，按单元格绝对坐标对齐
// - CSV 视为单表工作簿，表名取文件名（不含扩展名）
// - calamine 不暴露数字格式串，Excel 单元格的 format 恒为 None
// ==========================================

use crate::domain::workbook::{Cell, CellValue, Sheet, Workbook};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, instrument};

const EXCEL_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xls", "xlsb", "ods"];

// ==========================================
// FileParser Trait
// ==========================================
pub trait FileParser {
    /// 解析文件为工作簿
    ///
    /// # 返回
    /// - Ok(Workbook): 至少包含一张工作表
    /// - Err(ImportError): 文件不存在 / 格式不支持 / 解析失败
    fn parse_workbook(&self, file_path: &Path) -> ImportResult<Workbook>;
}

/// 小写扩展名
fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 按首个非空行嗅探分隔符（`;` 多于 `,` 则用 `;`）
    fn sniff_delimiter(path: &Path) -> ImportResult<u8> {
        let reader = BufReader::new(File::open(path)?);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let semicolons = line.matches(';').count();
            let commas = line.matches(',').count();
            return Ok(if semicolons > commas { b';' } else { b',' });
        }
        Ok(b',')
    }

    /// 数值形态: 可选前导负号 + 数字与 `.` `,`（日期、区间、电话号码不算）
    fn is_numeric_shape(text: &str) -> bool {
        let unsigned = text.strip_prefix('-').unwrap_or(text);
        unsigned.chars().any(|c| c.is_ascii_digit())
            && unsigned
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '.' | ','))
    }

    /// 字段 → 单元格（纯数值字段转为数值单元格，保留原文本）
    fn to_cell(cleaner: &DataCleaner, field: &str) -> Cell {
        let trimmed = field.trim();
        if Self::is_numeric_shape(trimmed) {
            if let Some(value) = cleaner.parse_price_text(trimmed) {
                return Cell::number(value).with_text(trimmed);
            }
        }
        Cell::text(trimmed)
    }
}

impl FileParser for CsvParser {
    fn parse_workbook(&self, file_path: &Path) -> ImportResult<Workbook> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let delimiter = Self::sniff_delimiter(file_path)?;
        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false) // 表头行由 SheetSelector 定位
            .flexible(true) // 允许行长度不一致
            .delimiter(delimiter)
            .from_reader(file);

        let cleaner = DataCleaner;
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(|f| Self::to_cell(&cleaner, f)).collect());
        }

        let name = file_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("csv")
            .to_string();
        debug!(sheet = %name, rows = rows.len(), delimiter = %(delimiter as char), "CSV 解析完成");
        Ok(Workbook::new(vec![Sheet::new(name, rows)]))
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    fn to_cell(data: &Data) -> Cell {
        match data {
            Data::Empty => Cell::empty(),
            Data::Int(i) => Cell::number(*i as f64),
            Data::Float(f) => Cell::number(*f),
            Data::String(s) => Cell::text(s.as_str()),
            Data::Bool(b) => Cell {
                value: CellValue::Bool(*b),
                text: b.to_string(),
                format: None,
            },
            // 日期 / 时长 / 错误值按显示文本处理
            other => Cell::text(other.to_string()),
        }
    }
}

impl FileParser for ExcelParser {
    fn parse_workbook(&self, file_path: &Path) -> ImportResult<Workbook> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if !EXCEL_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;
        let sheet_names = workbook.sheet_names();
        if sheet_names.is_empty() {
            return Err(ImportError::EmptyWorkbook(file_path.display().to_string()));
        }

        let mut sheets = Vec::with_capacity(sheet_names.len());
        for name in sheet_names {
            let range = workbook.worksheet_range(&name)?;

            // Range 可能不从 A1 开始，按绝对坐标补齐
            let (start_row, start_col) = range
                .start()
                .map(|(r, c)| (r as usize, c as usize))
                .unwrap_or((0, 0));

            let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row];
            for data_row in range.rows() {
                let mut cells = vec![Cell::empty(); start_col];
                cells.extend(data_row.iter().map(Self::to_cell));
                rows.push(cells);
            }

            debug!(sheet = %name, rows = rows.len(), "工作表读取完成");
            sheets.push(Sheet::new(name, rows));
        }

        Ok(Workbook::new(sheets))
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    #[instrument(skip(self, file_path), fields(path = %file_path.as_ref().display()))]
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<Workbook> {
        let path = file_path.as_ref();
        let ext = extension_of(path);

        let workbook = match ext.as_str() {
            "csv" => CsvParser.parse_workbook(path)?,
            e if EXCEL_EXTENSIONS.contains(&e) => ExcelParser.parse_workbook(path)?,
            _ => return Err(ImportError::UnsupportedFormat(ext)),
        };

        info!(sheets = workbook.sheets.len(), "工作簿加载完成");
        Ok(workbook)
    }
}

impl FileParser for UniversalFileParser {
    fn parse_workbook(&self, file_path: &Path) -> ImportResult<Workbook> {
        self.parse(file_path)
    }
}
