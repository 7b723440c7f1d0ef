// ==========================================
// 价格表导入与定价引擎 - 工作簿模型
// ==========================================
// 用途: 上游解析器（calamine / csv）产出的内存工作簿抽象
// 红线: 选表评分等临时元数据不写回 Sheet
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// CellValue - 单元格原始值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

// ==========================================
// Cell - 单元格（值 + 格式化文本 + 格式串）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Cell {
    pub value: CellValue,
    pub text: String,           // 格式化后的显示文本
    pub format: Option<String>, // 数字格式串（如 "[$USD] #,##0.00"）
}

impl Cell {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn number(value: f64) -> Self {
        Self {
            value: CellValue::Number(value),
            text: format_number(value),
            format: None,
        }
    }

    pub fn text<S: Into<String>>(value: S) -> Self {
        let s: String = value.into();
        if s.trim().is_empty() {
            return Self::empty();
        }
        Self {
            text: s.clone(),
            value: CellValue::Text(s),
            format: None,
        }
    }

    pub fn with_format<S: Into<String>>(mut self, format: S) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = text.into();
        self
    }

    /// 是否为空（值为空且显示文本为空白）
    pub fn is_empty(&self) -> bool {
        match &self.value {
            CellValue::Empty => self.text.trim().is_empty(),
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 是否为非空字符串单元格
    pub fn is_string(&self) -> bool {
        matches!(&self.value, CellValue::Text(s) if !s.trim().is_empty())
    }

    /// 有限正数值（仅数值单元格）
    pub fn positive_number(&self) -> Option<f64> {
        match self.value {
            CellValue::Number(n) if n.is_finite() && n > 0.0 => Some(n),
            _ => None,
        }
    }

    /// 显示文本（优先格式化文本，回退原始值）
    pub fn display(&self) -> String {
        if !self.text.trim().is_empty() {
            return self.text.trim().to_string();
        }
        match &self.value {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Bool(b) => b.to_string(),
        }
    }
}

/// 数值显示：整数不带小数位
fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

// ==========================================
// Sheet - 工作表
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new<S: Into<String>>(name: S, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(|r| r.as_slice())
    }

    /// 最大列数
    pub fn width(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// 指定行的显示文本（补齐到工作表宽度）
    pub fn row_texts(&self, index: usize) -> Vec<String> {
        self.row_texts_padded(index, self.width())
    }

    /// 指定行的显示文本（补齐到调用方给定的宽度）
    ///
    /// 逐行遍历时由调用方先计算一次 width()，避免每行重新扫描整表
    pub fn row_texts_padded(&self, index: usize, width: usize) -> Vec<String> {
        let mut texts: Vec<String> = self
            .row(index)
            .map(|cells| cells.iter().map(Cell::display).collect())
            .unwrap_or_default();
        texts.resize(width, String::new());
        texts
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }
}

// ==========================================
// Workbook - 工作簿（有序工作表）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn sheet(&self, index: usize) -> Option<&Sheet> {
        self.sheets.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_emptiness() {
        assert!(Cell::empty().is_empty());
        assert!(Cell::text("   ").is_empty());
        assert!(!Cell::number(0.0).is_empty());
        assert!(Cell::text("Modelo").is_string());
        assert!(!Cell::number(12.0).is_string());
    }

    #[test]
    fn test_cell_positive_number() {
        assert_eq!(Cell::number(12.5).positive_number(), Some(12.5));
        assert_eq!(Cell::number(-3.0).positive_number(), None);
        assert_eq!(Cell::number(f64::NAN).positive_number(), None);
        assert_eq!(Cell::text("12").positive_number(), None);
    }

    #[test]
    fn test_number_display() {
        assert_eq!(Cell::number(155001.0).display(), "155001");
        assert_eq!(Cell::number(12.5).display(), "12.5");
    }

    #[test]
    fn test_row_texts_padded_to_width() {
        let sheet = Sheet::new(
            "Lista",
            vec![
                vec![Cell::text("a"), Cell::text("b"), Cell::text("c")],
                vec![Cell::text("x")],
            ],
        );
        assert_eq!(sheet.width(), 3);
        assert_eq!(sheet.row_texts(1), vec!["x", "", ""]);
        assert_eq!(sheet.row_texts(9), vec!["", "", ""]);
    }

    #[test]
    fn test_row_texts_padded_uses_given_width() {
        let sheet = Sheet::new(
            "Lista",
            vec![
                vec![Cell::text("a"), Cell::text("b"), Cell::text("c")],
                vec![Cell::text("x"), Cell::number(2.0)],
            ],
        );
        let width = sheet.width();
        assert_eq!(sheet.row_texts_padded(1, width), sheet.row_texts(1));
        assert_eq!(sheet.row_texts_padded(1, 4), vec!["x", "2", "", ""]);
    }
}
