// ==========================================
// 价格表导入与定价引擎 - 毛利公式
// ==========================================
// 默认: (final - base) / final，base 为换算 + 容量调整后的基准价
// ==========================================

pub trait MarginFormula: Send + Sync {
    fn name(&self) -> &'static str;

    /// 计算毛利（比例值，final_price > 0）
    fn margin(&self, base_price: f64, final_price: f64) -> f64;
}

/// 以最终售价为分母
#[derive(Debug, Clone, Copy, Default)]
pub struct MarginOnFinalPrice;

impl MarginFormula for MarginOnFinalPrice {
    fn name(&self) -> &'static str {
        "margin_on_final_price"
    }

    fn margin(&self, base_price: f64, final_price: f64) -> f64 {
        (final_price - base_price) / final_price
    }
}

/// 以基准价为分母（加成率口径）
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupOnBasePrice;

impl MarginFormula for MarkupOnBasePrice {
    fn name(&self) -> &'static str {
        "markup_on_base_price"
    }

    fn margin(&self, base_price: f64, final_price: f64) -> f64 {
        (final_price - base_price) / base_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_formulas() {
        assert_eq!(MarginOnFinalPrice.margin(75.0, 100.0), 0.25);
        assert_eq!(MarkupOnBasePrice.margin(80.0, 100.0), 0.25);
    }
}
