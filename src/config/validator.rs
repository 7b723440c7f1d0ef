// ==========================================
// 价格表导入与定价引擎 - 定价参数校验
// ==========================================
// 职责: PricingConfig 边界校验（闭区间，NaN/∞ 视为越界）
// 红线: 越界参数绝不参与计算
// 分层:
// - validate: 流水线入口调用，任一参数（含任一渠道）非法则整次运行失败
// - validate_shared / channel_params: 计算期的分层校验
//   共享参数越界则整个产品失败，渠道参数越界仅影响该渠道
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::domain::pricing::{bounds, PricingConfig};
use std::collections::BTreeSet;

/// 单渠道生效参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelParams {
    pub markup: f64,
    pub commission: f64,
}

fn check_range(field: &str, value: f64, (low, high): (f64, f64)) -> ConfigResult<()> {
    if value.is_finite() && value >= low && value <= high {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            value,
            format!("超出范围 [{}, {}]", low, high),
        ))
    }
}

/// 校验共享参数（iva / capacity_factors / factor_base / rounding_decimals）
pub fn validate_shared(config: &PricingConfig) -> ConfigResult<()> {
    check_range("iva", config.iva, bounds::IVA)?;
    for (tier, factor) in &config.capacity_factors {
        check_range(
            &format!("capacity_factor/{}", tier),
            *factor,
            bounds::CAPACITY_FACTOR,
        )?;
    }
    check_range("factor_base", config.factor_base, bounds::CAPACITY_FACTOR)?;
    if config.rounding_decimals > bounds::MAX_ROUNDING_DECIMALS {
        return Err(ConfigError::invalid(
            "rounding_decimals",
            config.rounding_decimals,
            format!("最多 {} 位", bounds::MAX_ROUNDING_DECIMALS),
        ));
    }
    Ok(())
}

/// 取单渠道参数（缺少 markup 视为非法；缺少 commission 按 0 处理）
pub fn channel_params(config: &PricingConfig, channel: &str) -> ConfigResult<ChannelParams> {
    let markup = config.markups.get(channel).copied().ok_or_else(|| {
        ConfigError::invalid(format!("markup/{}", channel), "<缺失>", "渠道未配置加价率")
    })?;
    check_range(&format!("markup/{}", channel), markup, bounds::MARKUP)?;

    let commission = config.commissions.get(channel).copied().unwrap_or(0.0);
    check_range(
        &format!("commission/{}", channel),
        commission,
        bounds::COMMISSION,
    )?;

    Ok(ChannelParams { markup, commission })
}

/// 完整校验（流水线在选表之前调用）
pub fn validate(config: &PricingConfig) -> ConfigResult<()> {
    validate_shared(config)?;

    let channels = config.channel_order();
    if channels.is_empty() {
        return Err(ConfigError::invalid("channels", "[]", "至少需要一个渠道"));
    }

    let mut seen = BTreeSet::new();
    for channel in &channels {
        if channel.trim().is_empty() {
            return Err(ConfigError::invalid("channels", "\"\"", "渠道名不能为空"));
        }
        if !seen.insert(channel.as_str()) {
            return Err(ConfigError::invalid("channels", channel, "渠道重复"));
        }
        channel_params(config, channel)?;
    }
    Ok(())
}
