// ==========================================
// 价格表导入与定价引擎 - 工作表选择器
// ==========================================
// 职责: 定位表头行 + 工作表评分 + 选出最佳工作表
// 规则:
// - 表头候选: 前 20 行内首个 >5 个非空单元格且含字符串的行
// - 横幅行（标题行）下移 1~2 行重试，直到解析出 price
// - 数据行 < 2 的工作表得分为 0
// - 最高分胜出，同分取靠前的工作表
// ==========================================

use crate::domain::product::HeaderMap;
use crate::domain::types::CanonicalRole;
use crate::domain::workbook::{Sheet, Workbook};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::header_resolver::HeaderResolver;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// 表头扫描行数上限
pub const HEADER_SCAN_ROWS: usize = 20;
/// 表头候选行需要 **超过** 该数量的非空单元格
pub const MIN_HEADER_CELLS: usize = 5;
/// 超过该长度的单元格文本视为标题/横幅
pub const BANNER_TEXT_LEN: usize = 50;
/// 横幅行最多下移的行数
pub const HEADER_SHIFT_BUDGET: usize = 2;

// ==========================================
// SheetSelection - 单表评分结果（诊断信息）
// ==========================================
// 红线: 评分元数据不写回 Sheet
// 无表头候选的工作表: header_row = 0, score = 0, header_map 为空
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSelection {
    pub sheet_index: usize,
    pub sheet_name: String,
    pub header_row: usize, // 0 起
    pub header_shift: usize,
    pub data_rows: usize,
    pub score: u32,
    pub header_map: HeaderMap,
}

pub struct SheetSelector {
    resolver: HeaderResolver,
    cleaner: DataCleaner,
}

impl Default for SheetSelector {
    fn default() -> Self {
        Self::new(HeaderResolver::default())
    }
}

impl SheetSelector {
    pub fn new(resolver: HeaderResolver) -> Self {
        Self {
            resolver,
            cleaner: DataCleaner,
        }
    }

    pub fn resolver(&self) -> &HeaderResolver {
        &self.resolver
    }

    /// 选出单张最佳工作表
    ///
    /// # 返回
    /// - Ok(SheetSelection): 得分最高（同分取最靠前）
    /// - Err(NoUsableSheet): 全部得分为 0
    pub fn select(&self, workbook: &Workbook) -> ImportResult<SheetSelection> {
        let scores = self.score_all(workbook);
        match pick_best(&scores) {
            Some(selection) => {
                info!(
                    sheet = %selection.sheet_name,
                    score = selection.score,
                    header_row = selection.header_row,
                    "工作表选择完成"
                );
                Ok(selection.clone())
            }
            None => Err(no_usable_sheet(workbook)),
        }
    }

    /// 多表模式: 返回所有得分 > 0 的工作表（保持工作簿顺序）
    pub fn select_all(&self, workbook: &Workbook) -> ImportResult<Vec<SheetSelection>> {
        let usable = usable_sheets(&self.score_all(workbook));
        if usable.is_empty() {
            return Err(no_usable_sheet(workbook));
        }
        Ok(usable)
    }

    /// 对所有工作表评分（含 0 分，用于诊断展示）
    pub fn score_all(&self, workbook: &Workbook) -> Vec<SheetSelection> {
        workbook
            .sheets
            .iter()
            .enumerate()
            .map(|(idx, sheet)| self.score_sheet(idx, sheet))
            .collect()
    }

    /// 单表评分
    pub fn score_sheet(&self, sheet_index: usize, sheet: &Sheet) -> SheetSelection {
        let Some(candidate) = self.find_header_candidate(sheet) else {
            debug!(sheet = %sheet.name, "未找到表头候选行");
            return SheetSelection {
                sheet_index,
                sheet_name: sheet.name.clone(),
                header_row: 0,
                header_shift: 0,
                data_rows: 0,
                score: 0,
                header_map: HeaderMap::default(),
            };
        };

        let (header_row, header_map) = self.locate_header(sheet, candidate);
        let data_rows = count_data_rows(sheet, header_row);
        let score = score_header(&header_map, data_rows);

        debug!(
            sheet = %sheet.name,
            header_row,
            data_rows,
            roles = header_map.resolved_count(),
            score,
            "工作表评分"
        );

        SheetSelection {
            sheet_index,
            sheet_name: sheet.name.clone(),
            header_row,
            header_shift: header_row - candidate,
            data_rows,
            score,
            header_map,
        }
    }

    /// 查找表头候选行
    ///
    /// 首选: 前 20 行内首个非空单元格数 > 5 且含字符串的行
    /// 回退: 同窗口内非空单元格最多（≥2 且含字符串）的行，同数取靠前
    pub fn find_header_candidate(&self, sheet: &Sheet) -> Option<usize> {
        let window = sheet.row_count().min(HEADER_SCAN_ROWS);

        let qualifies = |idx: usize| -> (usize, bool) {
            let cells = sheet.row(idx).unwrap_or(&[]);
            let non_empty = cells.iter().filter(|c| !c.is_empty()).count();
            let has_string = cells.iter().any(|c| c.is_string());
            (non_empty, has_string)
        };

        if let Some(idx) = (0..window).find(|&idx| {
            let (non_empty, has_string) = qualifies(idx);
            non_empty > MIN_HEADER_CELLS && has_string
        }) {
            return Some(idx);
        }

        let mut fallback: Option<(usize, usize)> = None;
        for idx in 0..window {
            let (non_empty, has_string) = qualifies(idx);
            if non_empty >= 2 && has_string && fallback.map_or(true, |(_, n)| non_empty > n) {
                fallback = Some((idx, non_empty));
            }
        }
        fallback.map(|(idx, _)| idx)
    }

    /// 判断候选行是否像横幅/标题行
    pub fn is_banner_like(&self, sheet: &Sheet, row: usize) -> bool {
        let texts = sheet.row_texts(row);
        if texts.is_empty() {
            return true;
        }

        if texts.iter().any(|t| t.chars().count() > BANNER_TEXT_LEN) {
            return true;
        }

        let non_empty: Vec<&String> = texts.iter().filter(|t| !t.trim().is_empty()).collect();
        let empty = texts.len() - non_empty.len();
        if empty * 2 > texts.len() {
            return true;
        }

        let placeholders = non_empty
            .iter()
            .filter(|t| self.cleaner.is_placeholder_header(t))
            .count();
        placeholders >= 2 && placeholders * 3 >= non_empty.len()
    }

    /// 确定最终表头行（必要时下移）并解析角色
    fn locate_header(&self, sheet: &Sheet, candidate: usize) -> (usize, HeaderMap) {
        let original = self.resolver.resolve(&sheet.row_texts(candidate));
        if !self.is_banner_like(sheet, candidate) {
            return (candidate, original);
        }

        for shift in 1..=HEADER_SHIFT_BUDGET {
            let row = candidate + shift;
            if row >= sheet.row_count() {
                break;
            }
            let map = self.resolver.resolve(&sheet.row_texts(row));
            if map.has(CanonicalRole::Price) {
                debug!(sheet = %sheet.name, from = candidate, to = row, "横幅行下移");
                return (row, map);
            }
        }
        (candidate, original)
    }
}

/// 从评分结果中选出最佳工作表（得分 > 0，同分取最靠前）
pub fn pick_best(scores: &[SheetSelection]) -> Option<&SheetSelection> {
    let mut best: Option<&SheetSelection> = None;
    for candidate in scores.iter().filter(|s| s.score > 0) {
        // 严格大于才替换，保证同分时靠前者胜出
        if best.map_or(true, |b| candidate.score > b.score) {
            best = Some(candidate);
        }
    }
    best
}

/// 所有得分 > 0 的工作表（保持工作簿顺序）
pub fn usable_sheets(scores: &[SheetSelection]) -> Vec<SheetSelection> {
    scores.iter().filter(|s| s.score > 0).cloned().collect()
}

/// 表头行之后的非空数据行数
fn count_data_rows(sheet: &Sheet, header_row: usize) -> usize {
    sheet
        .rows
        .iter()
        .skip(header_row + 1)
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .count()
}

/// 加权评分
///
/// - price: +5 / +4 / +3（按模式优先级）
/// - model +3, brand +3, description +2, category +1
/// - 数据行: ≥10 → +5, ≥5 → +3, ≥2 → +1
/// - 已解析角色: ≥3 → +2, ≥4 → 再 +3
/// - 数据行 < 2 → 0
pub fn score_header(header_map: &HeaderMap, data_rows: usize) -> u32 {
    if data_rows < 2 {
        return 0;
    }

    let mut score = match header_map.get(CanonicalRole::Price).map(|c| c.priority) {
        Some(1) => 5,
        Some(2) => 4,
        Some(_) => 3,
        None => 0,
    };

    for (role, points) in [
        (CanonicalRole::Model, 3),
        (CanonicalRole::Brand, 3),
        (CanonicalRole::Description, 2),
        (CanonicalRole::Category, 1),
    ] {
        if header_map.has(role) {
            score += points;
        }
    }

    score += if data_rows >= 10 {
        5
    } else if data_rows >= 5 {
        3
    } else {
        1
    };

    let roles = header_map.resolved_count();
    if roles >= 3 {
        score += 2;
    }
    if roles >= 4 {
        score += 3;
    }
    score
}

pub fn no_usable_sheet(workbook: &Workbook) -> ImportError {
    ImportError::NoUsableSheet {
        sheets: workbook.sheets.iter().map(|s| s.name.clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workbook::Cell;

    fn text_row(values: &[&str]) -> Vec<Cell> {
        values.iter().map(|v| Cell::text(*v)).collect()
    }

    fn data_row(model: &str, price: f64) -> Vec<Cell> {
        vec![
            Cell::text(model),
            Cell::text("Moura"),
            Cell::text("Batería 12V"),
            Cell::text("Autos"),
            Cell::text("UN"),
            Cell::number(price),
        ]
    }

    const HEADERS: [&str; 6] = ["Modelo", "Marca", "Descripción", "Rubro", "Unidad", "Precio Lista"];

    fn price_sheet(name: &str, rows: usize) -> Sheet {
        let mut grid = vec![text_row(&HEADERS)];
        for i in 0..rows {
            grid.push(data_row(&format!("M{}", i), 100000.0 + i as f64));
        }
        Sheet::new(name, grid)
    }

    #[test]
    fn test_score_full_sheet() {
        let selector = SheetSelector::default();
        let selection = selector.score_sheet(0, &price_sheet("Lista", 12));

        // price P2 (4) + model 3 + brand 3 + desc 2 + cat 1 + rows 5 + roles 2 + 3
        assert_eq!(selection.score, 23);
        assert_eq!(selection.header_row, 0);
        assert_eq!(selection.data_rows, 12);
    }

    #[test]
    fn test_fewer_than_two_data_rows_scores_zero() {
        let selector = SheetSelector::default();
        assert_eq!(selector.score_sheet(0, &price_sheet("Una", 1)).score, 0);
        assert_eq!(selector.score_sheet(0, &price_sheet("Vacía", 0)).score, 0);
    }

    #[test]
    fn test_select_prefers_higher_score_and_first_on_tie() {
        let workbook = Workbook::new(vec![
            price_sheet("Resumen", 1),
            price_sheet("Enero", 6),
            price_sheet("Febrero", 6),
            price_sheet("Corta", 3),
        ]);
        let selection = SheetSelector::default().select(&workbook).unwrap();
        assert_eq!(selection.sheet_name, "Enero");
        assert_eq!(selection.sheet_index, 1);
    }

    #[test]
    fn test_no_usable_sheet() {
        let workbook = Workbook::new(vec![price_sheet("A", 1), Sheet::new("B", vec![])]);
        let err = SheetSelector::default().select(&workbook).unwrap_err();
        match err {
            ImportError::NoUsableSheet { sheets } => assert_eq!(sheets, vec!["A", "B"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_banner_row_is_shifted() {
        let banner = "LISTA DE PRECIOS BATERÍAS - VIGENCIA OCTUBRE 2026 - PRECIOS SIN IVA INCLUIDO";
        let mut grid = vec![vec![
            Cell::text(banner),
            Cell::text("x"),
            Cell::text("x"),
            Cell::text("x"),
            Cell::text("x"),
            Cell::text("x"),
        ]];
        grid.push(text_row(&HEADERS));
        for i in 0..4 {
            grid.push(data_row(&format!("M{}", i), 1000.0));
        }
        let sheet = Sheet::new("Octubre", grid);

        let selector = SheetSelector::default();
        assert!(selector.is_banner_like(&sheet, 0));

        let selection = selector.score_sheet(0, &sheet);
        assert_eq!(selection.header_row, 1);
        assert_eq!(selection.header_shift, 1);
        assert_eq!(selection.data_rows, 4);
        assert!(selection.header_map.has(CanonicalRole::Price));
    }

    fn banner_row(title: &str) -> Vec<Cell> {
        let mut row = vec![Cell::text(title)];
        row.extend((0..5).map(|_| Cell::text("x")));
        row
    }

    #[test]
    fn test_banner_shift_uses_full_budget() {
        let mut grid = vec![
            banner_row("LISTA DE PRECIOS BATERÍAS - VIGENCIA OCTUBRE 2026 - PRECIOS SIN IVA INCLUIDO"),
            text_row(&["Actualizado", "19/10/2026", "Sucursal", "Centro", "Vendedor", "Mostrador"]),
            text_row(&HEADERS),
        ];
        for i in 0..4 {
            grid.push(data_row(&format!("M{}", i), 1000.0));
        }
        let sheet = Sheet::new("Octubre", grid);

        let selection = SheetSelector::default().score_sheet(0, &sheet);
        assert_eq!(selection.header_row, 2);
        assert_eq!(selection.header_shift, 2);
        assert_eq!(selection.data_rows, 4);
        assert_eq!(selection.header_map.column(CanonicalRole::Price), Some(5));
    }

    #[test]
    fn test_banner_without_price_below_keeps_candidate() {
        let mut grid = vec![
            banner_row("BATERÍAS MOURA DISTRIBUIDOR OFICIAL ZONA NORTE - VIGENCIA OCTUBRE 2026"),
            text_row(&["Actualizado", "19/10/2026", "Sucursal", "Centro", "Vendedor", "Mostrador"]),
            text_row(&["Zona", "Norte", "Teléfono", "4455-6677", "Horario", "9 a 18"]),
            text_row(&HEADERS),
        ];
        for i in 0..4 {
            grid.push(data_row(&format!("M{}", i), 1000.0));
        }
        let sheet = Sheet::new("Octubre", grid);

        let selector = SheetSelector::default();
        assert!(selector.is_banner_like(&sheet, 0));

        // 表头位于预算之外，保留原候选行
        let selection = selector.score_sheet(0, &sheet);
        assert_eq!(selection.header_row, 0);
        assert_eq!(selection.header_shift, 0);
        assert!(!selection.header_map.has(CanonicalRole::Price));
    }

    #[test]
    fn test_placeholder_row_is_banner_like() {
        let sheet = Sheet::new(
            "Export",
            vec![text_row(&["Column1", "Column2", "Column3", "Precio", "Modelo", "Column6"])],
        );
        assert!(SheetSelector::default().is_banner_like(&sheet, 0));
    }

    #[test]
    fn test_narrow_sheet_uses_fallback_candidate() {
        let mut grid = vec![text_row(&["Código", "Precio"])];
        for i in 0..3 {
            grid.push(vec![Cell::text(format!("C{}", i)), Cell::number(10.0)]);
        }
        let sheet = Sheet::new("Corta", grid);
        let selector = SheetSelector::default();
        assert_eq!(selector.find_header_candidate(&sheet), Some(0));
        // price 4 + model 3 + rows 1
        assert_eq!(selector.score_sheet(0, &sheet).score, 8);
    }

    #[test]
    fn test_select_all_keeps_workbook_order() {
        let workbook = Workbook::new(vec![
            price_sheet("Chica", 3),
            price_sheet("Vacía", 0),
            price_sheet("Grande", 20),
        ]);
        let all = SheetSelector::default().select_all(&workbook).unwrap();
        let names: Vec<&str> = all.iter().map(|s| s.sheet_name.as_str()).collect();
        assert_eq!(names, vec!["Chica", "Grande"]);
    }
}
