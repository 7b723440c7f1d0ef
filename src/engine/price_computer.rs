// ==========================================
// 价格表导入与定价引擎 - 渠道价格计算
// ==========================================
// 职责: ProductRecord + PricingConfig (+ 汇率 / 等效型号) → 各渠道价格
// 公式（每个渠道，按配置顺序）:
//   with_iva    = base × (1 + iva/100)
//   with_markup = with_iva × (1 + markup/100)
//   final       = round(with_markup × (1 + commission/100))
//   margin      = MarginFormula(base, final)
// 规则:
// - 外币: 按卖出价换算；无汇率时按 FxPolicy 处理
// - 等效型号存在: base × (1 + 容量系数/100)
// - 仅在最后取整一次（rounding_decimals，四舍五入远离零）
// - 共享参数越界 → 整个产品失败；渠道参数缺失/越界 → 仅该渠道失败
// ==========================================

use crate::config::validator::{channel_params, validate_shared, ChannelParams};
use crate::domain::pricing::{
    ChannelOutcome, EquivalenceRecord, FxInfo, PriceResult, PricingConfig, ProductPricing,
};
use crate::domain::product::ProductRecord;
use crate::domain::types::{CurrencyUnit, FxPolicy};
use crate::engine::error::PricingError;
use crate::engine::margin::{MarginFormula, MarginOnFinalPrice};
use tracing::{debug, warn};

pub struct PriceComputer {
    margin: Box<dyn MarginFormula>,
}

impl Default for PriceComputer {
    fn default() -> Self {
        Self::new(Box::new(MarginOnFinalPrice))
    }
}

impl PriceComputer {
    pub fn new(margin: Box<dyn MarginFormula>) -> Self {
        Self { margin }
    }

    pub fn margin_formula(&self) -> &dyn MarginFormula {
        self.margin.as_ref()
    }

    /// 计算单个产品的各渠道价格
    ///
    /// # 参数
    /// - record: 产品记录
    /// - config: 定价参数快照
    /// - fx: 汇率（仅外币记录使用）
    /// - equivalence: 等效型号（存在时应用容量系数）
    /// - policy: 外币换算策略
    ///
    /// # 返回
    /// - Ok(ProductPricing): 每个渠道一个 ChannelOutcome
    /// - Err(PricingError): 外币被拒绝 / 基准价非法 / 共享参数非法
    pub fn compute(
        &self,
        record: &ProductRecord,
        config: &PricingConfig,
        fx: Option<&FxInfo>,
        equivalence: Option<&EquivalenceRecord>,
        policy: FxPolicy,
    ) -> Result<ProductPricing, PricingError> {
        validate_shared(config)?;

        let mut warnings = Vec::new();
        let mut base = record.base_price;
        let mut fx_rate_applied = None;

        // ===== 币种换算 =====
        if record.currency == CurrencyUnit::Foreign {
            if !policy.conversion_enabled() {
                return Err(PricingError::ForeignCurrencyRejected {
                    sheet: record.sheet_name.clone(),
                    row: record.row_number,
                });
            }
            match fx.filter(|rate| rate.is_usable()) {
                Some(rate) => {
                    base *= rate.sell;
                    fx_rate_applied = Some(rate.sell);
                }
                None if policy == FxPolicy::ConvertOrKeep => {
                    warnings.push("无可用汇率，按外币原值计算".to_string());
                }
                None => {
                    return Err(PricingError::InvalidBasePrice {
                        sheet: record.sheet_name.clone(),
                        row: record.row_number,
                        value: record.base_price,
                        reason: "外币报价缺少汇率".to_string(),
                    });
                }
            }
        }

        if !(base.is_finite() && base > 0.0) {
            return Err(PricingError::InvalidBasePrice {
                sheet: record.sheet_name.clone(),
                row: record.row_number,
                value: base,
                reason: "基准价必须为有限正数".to_string(),
            });
        }

        // ===== 容量调整 =====
        let capacity_factor_applied = equivalence.map(|eq| {
            let factor = config.capacity_factor_for(eq.capacity_ah);
            base *= 1.0 + factor / 100.0;
            factor
        });

        // ===== 渠道计算 =====
        let channels = config
            .channel_order()
            .into_iter()
            .map(|channel| match channel_params(config, &channel) {
                Ok(params) => self.price_channel(channel, base, config, params),
                Err(e) => {
                    warn!(model = %record.model, channel = %channel, error = %e, "渠道参数非法");
                    ChannelOutcome::Failed {
                        channel,
                        reason: e.to_string(),
                    }
                }
            })
            .collect();

        debug!(
            sheet = %record.sheet_name,
            row = record.row_number,
            model = %record.model,
            base,
            "产品定价完成"
        );

        Ok(ProductPricing {
            record: record.clone(),
            resolved_base_price: base,
            fx_rate_applied,
            capacity_factor_applied,
            channels,
            warnings,
        })
    }

    fn price_channel(
        &self,
        channel: String,
        base: f64,
        config: &PricingConfig,
        params: ChannelParams,
    ) -> ChannelOutcome {
        let price_with_iva = base * (1.0 + config.iva / 100.0);
        let price_with_markup = price_with_iva * (1.0 + params.markup / 100.0);
        let final_price = round_to(
            price_with_markup * (1.0 + params.commission / 100.0),
            config.rounding_decimals,
        );

        if final_price <= 0.0 {
            return ChannelOutcome::Failed {
                channel,
                reason: format!("取整后价格为 {}", final_price),
            };
        }

        ChannelOutcome::Priced {
            channel,
            result: PriceResult {
                base_price: base,
                price_with_iva,
                price_with_markup,
                final_price,
                markup_applied: params.markup,
                commission_applied: params.commission,
                margin_pct: self.margin.margin(base, final_price),
            },
        }
    }
}

/// 保留 decimals 位小数（四舍五入远离零）
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if decimals == 0 {
        return value.round();
    }
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
