// ==========================================
// 销售分析看板 - 列映射仓储
// ==========================================
// 保存语义: 先停用该实体全部映射，再 upsert 新映射为启用
// 删除语义: 软删除（停用），不物理删除
// ==========================================

use crate::domain::{CanonicalField, ColumnMappingEntry};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

pub struct ColumnMappingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ColumnMappingRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 实体的启用映射（按 excel_column 排序）
    pub fn list_active(&self, entity: &str) -> RepositoryResult<Vec<ColumnMappingEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, entity, excel_column, db_column, is_active, created_at, updated_at
            FROM column_mapping
            WHERE entity = ?1 AND is_active = 1
            ORDER BY excel_column
            "#,
        )?;

        let rows = stmt
            .query_map([entity], map_mapping_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 替换实体的启用映射
    ///
    /// # 返回
    /// - Ok(count): 写入（新增或重新启用）的映射条数
    pub fn replace_active(
        &self,
        entity: &str,
        mappings: &[(String, CanonicalField)],
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        tx.execute(
            "UPDATE column_mapping SET is_active = 0, updated_at = ?2 WHERE entity = ?1",
            params![entity, now],
        )?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO column_mapping (
                    entity, excel_column, db_column, is_active, created_at, updated_at
                ) VALUES (?1, ?2, ?3, 1, ?4, ?4)
                ON CONFLICT (entity, excel_column, db_column)
                DO UPDATE SET is_active = 1, updated_at = excluded.updated_at
                "#,
            )?;
            for (excel_column, db_column) in mappings {
                count += stmt.execute(params![entity, excel_column, db_column.as_str(), now])?;
            }
        }

        tx.commit()?;
        info!(entity, count, "列映射已保存");
        Ok(count)
    }

    /// 停用实体的全部映射
    pub fn deactivate_all(&self, entity: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            "UPDATE column_mapping SET is_active = 0, updated_at = ?2 WHERE entity = ?1 AND is_active = 1",
            params![entity, Utc::now().to_rfc3339()],
        )?;
        Ok(updated)
    }
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn map_mapping_row(row: &Row<'_>) -> rusqlite::Result<ColumnMappingEntry> {
    let db_column: String = row.get(3)?;
    let db_column = CanonicalField::from_str(&db_column).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let is_active: i64 = row.get(4)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;

    Ok(ColumnMappingEntry {
        id: row.get(0)?,
        entity: row.get(1)?,
        excel_column: row.get(2)?,
        db_column,
        is_active: is_active != 0,
        created_at: parse_ts(5, &created_at)?,
        updated_at: parse_ts(6, &updated_at)?,
    })
}
