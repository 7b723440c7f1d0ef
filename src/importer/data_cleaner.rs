// ==========================================
// 价格表导入与定价引擎 - 数据清洗器
// ==========================================
// 职责: 表头规范化（小写 / 去重音 / 去符号）/ NULL 标准化 / 价格文本解析
// ==========================================

use once_cell::sync::Lazy;
use regex::Regex;

/// 自动生成的占位列名（Column1 / Unnamed: 3 / __EMPTY_2 / F7 ...）
static PLACEHOLDER_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:unnamed:?\s*_?\d+|__empty(?:_\d+)?|col(?:umn|umna)?\s*_?\d+|field\s*_?\d+|campo\s*_?\d+|f\d+)$",
    )
    .expect("占位列名正则非法")
});

/// 价格文本中允许出现的币种记号（解析前剔除）
const CURRENCY_TOKENS: [&str; 6] = ["u$s", "us$", "u$d", "usd", "ars", "$"];

pub struct DataCleaner;

impl DataCleaner {
    /// 清洗文本字段（TRIM + 可选 UPPER）
    pub fn clean_text(&self, value: &str, uppercase: bool) -> String {
        let trimmed = value.trim();
        if uppercase {
            trimmed.to_uppercase()
        } else {
            trimmed.to_string()
        }
    }

    /// 标准化 NULL 值（空字符串/空白 → None）
    pub fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    /// 表头规范化
    ///
    /// 小写 → 去重音 → 非字母数字替换为空格（保留 `$`）→ 合并空白
    pub fn normalize_header(&self, value: &str) -> String {
        let folded: String = value
            .to_lowercase()
            .chars()
            .map(fold_diacritic)
            .map(|c| if c.is_alphanumeric() || c == '$' { c } else { ' ' })
            .collect();
        folded.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// 是否为自动生成的占位列名
    pub fn is_placeholder_header(&self, value: &str) -> bool {
        let lower = value.trim().to_lowercase();
        !lower.is_empty() && PLACEHOLDER_HEADER.is_match(&lower)
    }

    /// 解析价格文本
    ///
    /// # 支持
    /// - `$ 1.234,56` / `1,234.56` / `U$S 12,5` / `155001`
    ///
    /// # 规则
    /// - 同时出现 `.` 与 `,` 时，靠后的为小数点
    /// - 仅出现 `,`：唯一且其后 ≤2 位为小数点，否则为千分位
    /// - 仅出现 `.`：多个或唯一且其后恰好 3 位为千分位，否则为小数点
    /// - 剔除币种记号后仍含字母 → None
    pub fn parse_price_text(&self, value: &str) -> Option<f64> {
        let mut text = value.trim().to_lowercase();
        if text.is_empty() {
            return None;
        }
        for token in CURRENCY_TOKENS {
            text = text.replace(token, "");
        }
        if text.chars().any(|c| c.is_alphabetic()) {
            return None;
        }

        let negative = text.trim_start().starts_with('-');
        let kept: String = text
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
            .collect();
        if !kept.chars().any(|c| c.is_ascii_digit()) {
            return None;
        }

        let normalized = normalize_separators(&kept)?;
        let parsed = normalized.parse::<f64>().ok()?;
        let signed = if negative { -parsed } else { parsed };
        signed.is_finite().then_some(signed)
    }
}

/// 统一小数点为 `.`，去除千分位
fn normalize_separators(kept: &str) -> Option<String> {
    let last_dot = kept.rfind('.');
    let last_comma = kept.rfind(',');

    let decimal_sep = match (last_dot, last_comma) {
        (Some(d), Some(c)) => Some(if d > c { '.' } else { ',' }),
        (None, Some(c)) => {
            let commas = kept.matches(',').count();
            let decimals = kept.len() - c - 1;
            (commas == 1 && decimals <= 2).then_some(',')
        }
        (Some(d), None) => {
            let dots = kept.matches('.').count();
            let decimals = kept.len() - d - 1;
            (!(dots > 1 || decimals == 3)).then_some('.')
        }
        (None, None) => None,
    };

    let mut out = String::with_capacity(kept.len());
    for (idx, c) in kept.char_indices() {
        match c {
            '.' | ',' => {
                let is_decimal = Some(c) == decimal_sep
                    && Some(idx) == if c == '.' { last_dot } else { last_comma };
                if is_decimal {
                    out.push('.');
                }
            }
            _ => out.push(c),
        }
    }
    if out.is_empty() || out == "." {
        return None;
    }
    Some(out)
}

/// 拉丁字母去重音（输入需已小写）
pub(crate) fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        _ => c,
    }
}
