// ==========================================
// 价格表导入与定价引擎 - SQLite 配置来源
// ==========================================
// 职责: 从 config_kv 表（scope_id='global'）只读加载定价参数
// 键:
// - iva / channels / rounding_decimals / capacity_factor_base
// - markup/{channel} / commission/{channel} / capacity_factor/{ah}
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::provider::ConfigProvider;
use crate::db::{open_sqlite_connection, warn_on_schema_mismatch};
use crate::domain::pricing::PricingConfig;
use async_trait::async_trait;
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// config_kv 键
pub mod config_keys {
    pub const IVA: &str = "iva";
    pub const CHANNELS: &str = "channels";
    pub const ROUNDING_DECIMALS: &str = "rounding_decimals";
    pub const CAPACITY_FACTOR_BASE: &str = "capacity_factor_base";
    pub const MARKUP_PREFIX: &str = "markup/";
    pub const COMMISSION_PREFIX: &str = "commission/";
    pub const CAPACITY_FACTOR_PREFIX: &str = "capacity_factor/";
}

// ==========================================
// SqliteConfigProvider
// ==========================================
pub struct SqliteConfigProvider {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteConfigProvider {
    /// 打开数据库文件
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        warn_on_schema_mismatch(&conn, db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（会再次应用统一 PRAGMA，幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| ConfigError::Storage(format!("锁获取失败: {}", e)))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    /// 读取 global scope 全部键值
    fn load_global_values(&self) -> ConfigResult<BTreeMap<String, String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::Storage(format!("锁获取失败: {}", e)))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut values = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            values.insert(key, value);
        }
        Ok(values)
    }
}

fn parse_f64(key: &str, raw: &str) -> ConfigResult<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::invalid(key, raw, "不是数值"))
}

/// channels 支持 JSON 数组或逗号分隔
fn parse_channels(raw: &str) -> ConfigResult<Vec<String>> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }
    Ok(trimmed
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect())
}

/// 键值表 → PricingConfig
///
/// 无任何定价键 → NotFound（链路继续下一个来源）
pub fn config_from_values(values: &BTreeMap<String, String>) -> ConfigResult<PricingConfig> {
    use config_keys::*;

    let mut markups = BTreeMap::new();
    let mut commissions = BTreeMap::new();
    let mut capacity_factors = BTreeMap::new();

    for (key, raw) in values {
        if let Some(channel) = key.strip_prefix(MARKUP_PREFIX) {
            markups.insert(channel.to_string(), parse_f64(key, raw)?);
        } else if let Some(channel) = key.strip_prefix(COMMISSION_PREFIX) {
            commissions.insert(channel.to_string(), parse_f64(key, raw)?);
        } else if let Some(tier) = key.strip_prefix(CAPACITY_FACTOR_PREFIX) {
            let ah = tier
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::invalid(key, tier, "容量档位必须为整数 Ah"))?;
            capacity_factors.insert(ah, parse_f64(key, raw)?);
        }
    }

    let iva = match values.get(IVA) {
        Some(raw) => parse_f64(IVA, raw)?,
        None if markups.is_empty() => {
            return Err(ConfigError::NotFound {
                provider: "sqlite".to_string(),
            })
        }
        None => return Err(ConfigError::invalid(IVA, "<缺失>", "未配置增值税")),
    };

    let channels = match values.get(CHANNELS) {
        Some(raw) => parse_channels(raw)?,
        None => Vec::new(),
    };
    let factor_base = match values.get(CAPACITY_FACTOR_BASE) {
        Some(raw) => parse_f64(CAPACITY_FACTOR_BASE, raw)?,
        None => 0.0,
    };
    let rounding_decimals = match values.get(ROUNDING_DECIMALS) {
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::invalid(ROUNDING_DECIMALS, raw, "必须为非负整数"))?,
        None => 0,
    };

    Ok(PricingConfig {
        iva,
        channels,
        markups,
        commissions,
        capacity_factors,
        factor_base,
        rounding_decimals,
    })
}

#[async_trait]
impl ConfigProvider for SqliteConfigProvider {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self) -> ConfigResult<PricingConfig> {
        let values = self.load_global_values()?;
        debug!(keys = values.len(), "config_kv 读取完成");
        config_from_values(&values)
    }
}
