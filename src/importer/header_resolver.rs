// ==========================================
// 价格表导入与定价引擎 - 表头角色解析器
// ==========================================
// 职责: 原始表头 → 规范角色（price/model/brand/description/category）
// 规则: 有序模式表 (role, priority, matcher)，纯函数求值
// 红线: 高优先级价格模式永远胜过低优先级，与列顺序无关
// ==========================================

use crate::domain::product::{HeaderMap, ResolvedColumn};
use crate::domain::types::CanonicalRole;
use crate::importer::data_cleaner::DataCleaner;
use tracing::debug;

// ==========================================
// Matcher - 单条匹配规则
// ==========================================
// 输入均为 DataCleaner::normalize_header 之后的文本
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// 子串匹配
    Contains(&'static str),
    /// 整词匹配（用于 pvp / cod / sku 这类短缩写）
    Word(&'static str),
}

impl Matcher {
    pub fn matches(&self, normalized: &str) -> bool {
        match self {
            Matcher::Contains(needle) => normalized.contains(needle),
            Matcher::Word(word) => normalized.split(' ').any(|token| token == *word),
        }
    }

    pub fn pattern(&self) -> &'static str {
        match self {
            Matcher::Contains(p) | Matcher::Word(p) => p,
        }
    }
}

// ==========================================
// RolePattern - (角色, 优先级, 匹配器)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolePattern {
    pub role: CanonicalRole,
    pub priority: u8,
    pub matcher: Matcher,
}

const fn pattern(role: CanonicalRole, priority: u8, matcher: Matcher) -> RolePattern {
    RolePattern {
        role,
        priority,
        matcher,
    }
}

use CanonicalRole::{Brand, Category, Description, Model, Price};
use Matcher::{Contains, Word};

/// 默认模式表
///
/// 同一角色内按表中顺序尝试；价格角色优先级:
/// 1 = 建议零售价 / 线下公开价，2 = 通用售价 / 目录价，3 = 通用成本 / 金额
pub static DEFAULT_PATTERNS: &[RolePattern] = &[
    // ===== 价格 P1: 建议零售价 / 线下公开价 =====
    pattern(Price, 1, Contains("precio publico")),
    pattern(Price, 1, Contains("publico sugerido")),
    pattern(Price, 1, Contains("sugerido")),
    pattern(Price, 1, Contains("recomendado")),
    pattern(Price, 1, Word("pvp")),
    pattern(Price, 1, Word("msrp")),
    pattern(Price, 1, Contains("off line")),
    pattern(Price, 1, Contains("offline")),
    pattern(Price, 1, Contains("retail")),
    // ===== 价格 P2: 通用售价 / 目录价 =====
    pattern(Price, 2, Contains("precio de venta")),
    pattern(Price, 2, Contains("precio venta")),
    pattern(Price, 2, Contains("precio de lista")),
    pattern(Price, 2, Contains("precio lista")),
    pattern(Price, 2, Contains("list price")),
    pattern(Price, 2, Contains("sale price")),
    pattern(Price, 2, Word("lista")),
    pattern(Price, 2, Word("venta")),
    pattern(Price, 2, Contains("precio")),
    pattern(Price, 2, Contains("price")),
    // ===== 价格 P3: 通用成本 / 金额 =====
    pattern(Price, 3, Contains("costo")),
    pattern(Price, 3, Contains("coste")),
    pattern(Price, 3, Word("cost")),
    pattern(Price, 3, Contains("importe")),
    pattern(Price, 3, Contains("valor")),
    pattern(Price, 3, Contains("monto")),
    pattern(Price, 3, Contains("unitario")),
    pattern(Price, 3, Word("neto")),
    pattern(Price, 3, Word("value")),
    pattern(Price, 3, Word("amount")),
    // ===== 型号 =====
    pattern(Model, 1, Word("modelo")),
    pattern(Model, 1, Word("model")),
    pattern(Model, 1, Contains("modelo")),
    pattern(Model, 2, Contains("codigo")),
    pattern(Model, 2, Word("cod")),
    pattern(Model, 2, Word("sku")),
    pattern(Model, 3, Contains("articulo")),
    pattern(Model, 3, Contains("referencia")),
    pattern(Model, 3, Word("ref")),
    pattern(Model, 3, Contains("part number")),
    pattern(Model, 3, Word("item")),
    // ===== 品牌 =====
    pattern(Brand, 1, Contains("marca")),
    pattern(Brand, 1, Word("brand")),
    pattern(Brand, 2, Contains("fabricante")),
    pattern(Brand, 2, Word("make")),
    // ===== 描述 =====
    pattern(Description, 1, Contains("descripcion")),
    pattern(Description, 1, Contains("description")),
    pattern(Description, 2, Contains("detalle")),
    pattern(Description, 2, Word("desc")),
    pattern(Description, 3, Word("producto")),
    pattern(Description, 3, Contains("nombre")),
    // ===== 分类 =====
    pattern(Category, 1, Contains("categoria")),
    pattern(Category, 1, Contains("category")),
    pattern(Category, 2, Word("rubro")),
    pattern(Category, 2, Contains("familia")),
    pattern(Category, 2, Contains("grupo")),
    pattern(Category, 3, Word("linea")),
    pattern(Category, 3, Word("tipo")),
];

// ==========================================
// HeaderResolver
// ==========================================
pub struct HeaderResolver {
    patterns: Vec<RolePattern>,
    cleaner: DataCleaner,
}

impl Default for HeaderResolver {
    fn default() -> Self {
        Self::with_patterns(DEFAULT_PATTERNS.to_vec())
    }
}

impl HeaderResolver {
    /// 使用自定义模式表（可扩展 / 重排，不改控制流）
    pub fn with_patterns(patterns: Vec<RolePattern>) -> Self {
        Self {
            patterns,
            cleaner: DataCleaner,
        }
    }

    pub fn patterns(&self) -> &[RolePattern] {
        &self.patterns
    }

    /// 解析表头
    ///
    /// # 规则
    /// 1. 角色按 CanonicalRole::ALL 顺序求值
    /// 2. 每个角色内按优先级升序、同优先级按模式表顺序尝试
    /// 3. 每条模式按列顺序扫描，首个命中即胜出
    /// 4. 已被前序角色占用的列不参与后续角色
    pub fn resolve<S: AsRef<str>>(&self, headers: &[S]) -> HeaderMap {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| self.cleaner.normalize_header(h.as_ref()))
            .collect();

        let mut map = HeaderMap::default();
        for role in CanonicalRole::ALL {
            let mut candidates: Vec<&RolePattern> =
                self.patterns.iter().filter(|p| p.role == role).collect();
            // 稳定排序：同优先级保持表中顺序
            candidates.sort_by_key(|p| p.priority);

            let hit = candidates.iter().find_map(|p| {
                normalized
                    .iter()
                    .enumerate()
                    .filter(|(idx, text)| !text.is_empty() && !map.is_column_claimed(*idx))
                    .find(|(_, text)| p.matcher.matches(text))
                    .map(|(idx, _)| (idx, *p))
            });

            if let Some((index, p)) = hit {
                debug!(
                    role = %role,
                    column = index,
                    header = %headers[index].as_ref(),
                    pattern = p.matcher.pattern(),
                    priority = p.priority,
                    "表头角色命中"
                );
                map.insert(
                    role,
                    ResolvedColumn {
                        index,
                        header: headers[index].as_ref().trim().to_string(),
                        pattern: p.matcher.pattern().to_string(),
                        priority: p.priority,
                    },
                );
            }
        }
        map
    }
}

/// 使用默认模式表解析
pub fn resolve<S: AsRef<str>>(headers: &[S]) -> HeaderMap {
    HeaderResolver::default().resolve(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::PricePriority;

    #[test]
    fn test_resolve_basic_headers() {
        let map = resolve(&["Código", "Marca", "Descripción", "Rubro", "Precio Lista"]);

        assert_eq!(map.column(CanonicalRole::Model), Some(0));
        assert_eq!(map.column(CanonicalRole::Brand), Some(1));
        assert_eq!(map.column(CanonicalRole::Description), Some(2));
        assert_eq!(map.column(CanonicalRole::Category), Some(3));
        assert_eq!(map.column(CanonicalRole::Price), Some(4));
        assert_eq!(map.price_priority(), Some(PricePriority::SaleOrList));
    }

    #[test]
    fn test_high_priority_price_wins_regardless_of_order() {
        let forward = resolve(&["Modelo", "Precio Lista", "Costo", "Precio Público Sugerido"]);
        assert_eq!(forward.column(CanonicalRole::Price), Some(3));
        assert_eq!(forward.price_priority(), Some(PricePriority::RecommendedPublic));

        let reversed = resolve(&["Precio Público Sugerido", "Costo", "Precio Lista", "Modelo"]);
        assert_eq!(reversed.column(CanonicalRole::Price), Some(0));
        assert_eq!(reversed.price_priority(), Some(PricePriority::RecommendedPublic));
    }

    #[test]
    fn test_sale_price_beats_cost() {
        let map = resolve(&["Costo", "Modelo", "Venta"]);
        assert_eq!(map.column(CanonicalRole::Price), Some(2));
        assert_eq!(map.price_priority(), Some(PricePriority::SaleOrList));
    }

    #[test]
    fn test_cost_used_when_nothing_better() {
        let map = resolve(&["Modelo", "Importe"]);
        assert_eq!(map.column(CanonicalRole::Price), Some(1));
        assert_eq!(map.price_priority(), Some(PricePriority::CostOrValue));
    }

    #[test]
    fn test_missing_price_stays_unresolved() {
        let map = resolve(&["Modelo", "Marca", "Stock"]);
        assert!(!map.has(CanonicalRole::Price));
        assert_eq!(map.column(CanonicalRole::Model), Some(0));
    }

    #[test]
    fn test_word_matcher_does_not_match_inside_words() {
        assert!(Word("cod").matches("cod art"));
        assert!(!Word("cod").matches("codex"));
        assert!(Contains("codigo").matches("codigo interno"));
    }

    #[test]
    fn test_claimed_column_not_reused() {
        // "Código Producto" 先被 model 占用，description 不再复用
        let map = resolve(&["Código Producto", "Precio"]);
        assert_eq!(map.column(CanonicalRole::Model), Some(0));
        assert!(!map.has(CanonicalRole::Description));
    }

    #[test]
    fn test_custom_pattern_table() {
        let resolver = HeaderResolver::with_patterns(vec![
            pattern(Price, 1, Contains("tarifa")),
            pattern(Model, 1, Word("ref")),
        ]);
        let map = resolver.resolve(&["Ref", "Tarifa 2026", "Precio"]);
        assert_eq!(map.column(CanonicalRole::Price), Some(1));
        assert_eq!(map.column(CanonicalRole::Model), Some(0));
    }

    #[test]
    fn test_empty_headers_ignored() {
        let map = resolve(&["", "  ", "Precio"]);
        assert_eq!(map.column(CanonicalRole::Price), Some(2));
        assert_eq!(map.resolved_count(), 1);
    }
}
