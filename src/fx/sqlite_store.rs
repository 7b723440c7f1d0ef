// ==========================================
// 价格表导入与定价引擎 - 汇率持久化（SQLite）
// ==========================================
// 表: fx_rate_history（追加写，读取最新一条）
// 用途: 实时来源不可用时的降级汇率
// ==========================================

use crate::db::{ensure_schema, open_sqlite_connection};
use crate::domain::pricing::FxInfo;
use crate::fx::error::{FxError, FxResult};
use crate::fx::provider::FxRateStore;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub struct SqliteFxRateStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteFxRateStore {
    /// 打开数据库（确保 fx_rate_history 存在）
    pub fn new(db_path: &str) -> FxResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> FxResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FxError::Storage(format!("锁获取失败: {}", e)))
    }
}

#[async_trait]
impl FxRateStore for SqliteFxRateStore {
    async fn load_latest(&self) -> FxResult<Option<FxInfo>> {
        let conn = self.lock()?;
        let rate = conn
            .query_row(
                "SELECT buy, sell, rate_date, source FROM fx_rate_history ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(FxInfo {
                        buy: row.get(0)?,
                        sell: row.get(1)?,
                        date: row.get(2)?,
                        source: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(rate)
    }

    async fn save(&self, rate: &FxInfo) -> FxResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO fx_rate_history (buy, sell, rate_date, source, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                rate.buy,
                rate.sell,
                rate.date,
                rate.source,
                chrono::Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_memory_store() -> SqliteFxRateStore {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        SqliteFxRateStore::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[tokio::test]
    async fn test_save_and_load_latest() {
        let store = in_memory_store();
        assert_eq!(store.load_latest().await.unwrap(), None);

        for sell in [1200.0, 1250.0] {
            store
                .save(&FxInfo {
                    buy: sell - 40.0,
                    sell,
                    date: "2026-10-19".to_string(),
                    source: "test".to_string(),
                })
                .await
                .unwrap();
        }

        let latest = store.load_latest().await.unwrap().unwrap();
        assert_eq!(latest.sell, 1250.0);
        assert_eq!(latest.buy, 1210.0);
    }
}
