// ==========================================
// 销售分析看板 - 汇率仓储
// ==========================================
// 保存语义: 按 (year, currency) upsert，同一批次中后出现者覆盖
// ==========================================

use crate::domain::{ExchangeRate, StoredExchangeRate};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

pub struct ExchangeRateRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ExchangeRateRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 批量 upsert（单事务）
    ///
    /// # 返回
    /// - Ok(count): 写入条数（含覆盖）
    pub fn upsert_all(&self, rates: &[ExchangeRate]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO exchange_rate (year, currency, rate, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT (year, currency)
                DO UPDATE SET rate = excluded.rate, updated_at = excluded.updated_at
                "#,
            )?;
            for rate in rates {
                count += stmt.execute(params![rate.year, rate.currency, rate.rate, now])?;
            }
        }

        tx.commit()?;
        info!(count, "汇率已保存");
        Ok(count)
    }

    /// 汇率列表（年份降序、币种升序）
    pub fn list(&self, year: Option<i32>) -> RepositoryResult<Vec<StoredExchangeRate>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT year, currency, rate, updated_at
            FROM exchange_rate
            WHERE ?1 IS NULL OR year = ?1
            ORDER BY year DESC, currency ASC
            "#,
        )?;

        let rows = stmt
            .query_map([year], map_rate_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn map_rate_row(row: &Row<'_>) -> rusqlite::Result<StoredExchangeRate> {
    let updated_at: String = row.get(3)?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(StoredExchangeRate {
        year: row.get(0)?,
        currency: row.get(1)?,
        rate: row.get(2)?,
        updated_at,
    })
}
