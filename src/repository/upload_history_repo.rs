// ==========================================
// 销售分析看板 - 上传历史仓储
// ==========================================
// 生命周期: processing → success / failed
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::{UploadHistory, UploadStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// 视为“全部实体”的筛选值
pub const ALL_ENTITIES: &str = "All";

pub struct UploadHistoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl UploadHistoryRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 新建一条 processing 状态的上传记录
    pub fn create(
        &self,
        batch_id: &str,
        entity: &str,
        file_name: &str,
    ) -> RepositoryResult<UploadHistory> {
        let history = UploadHistory {
            id: Uuid::new_v4().to_string(),
            batch_id: batch_id.to_string(),
            entity: entity.to_string(),
            file_name: file_name.to_string(),
            file_path: None,
            rows_uploaded: None,
            status: UploadStatus::Processing,
            error_message: None,
            uploaded_at: Utc::now(),
        };

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO upload_history (
                id, batch_id, entity, file_name, file_path,
                rows_uploaded, status, error_message, uploaded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                history.id,
                history.batch_id,
                history.entity,
                history.file_name,
                history.file_path,
                history.rows_uploaded,
                history.status.as_str(),
                history.error_message,
                history.uploaded_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;

        Ok(history)
    }

    /// 标记成功
    ///
    /// # 参数
    /// - note: 附加说明（如跳过的重复行数），无则为 None
    pub fn mark_success(
        &self,
        id: &str,
        rows_uploaded: i64,
        note: Option<&str>,
    ) -> RepositoryResult<()> {
        self.update_status(id, UploadStatus::Success, Some(rows_uploaded), note)
    }

    /// 标记失败
    pub fn mark_failed(&self, id: &str, error_message: &str) -> RepositoryResult<()> {
        self.update_status(id, UploadStatus::Failed, None, Some(error_message))
    }

    fn update_status(
        &self,
        id: &str,
        status: UploadStatus,
        rows_uploaded: Option<i64>,
        error_message: Option<&str>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            r#"
            UPDATE upload_history
            SET status = ?2,
                rows_uploaded = COALESCE(?3, rows_uploaded),
                error_message = ?4
            WHERE id = ?1
            "#,
            params![id, status.as_str(), rows_uploaded, error_message],
        )?;

        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "upload_history".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<UploadHistory>> {
        let conn = self.get_conn()?;
        let history = conn
            .query_row(
                r#"
                SELECT id, batch_id, entity, file_name, file_path,
                       rows_uploaded, status, error_message, uploaded_at
                FROM upload_history WHERE id = ?1
                "#,
                [id],
                map_history_row,
            )
            .optional()?;
        Ok(history)
    }

    /// 最近的上传记录（按上传时间倒序）
    ///
    /// # 参数
    /// - entity: None 或 "All" 表示全部实体
    pub fn list(&self, entity: Option<&str>, limit: usize) -> RepositoryResult<Vec<UploadHistory>> {
        let conn = self.get_conn()?;
        let filter = entity.filter(|e| !e.is_empty() && *e != ALL_ENTITIES);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut stmt = conn.prepare(
            r#"
            SELECT id, batch_id, entity, file_name, file_path,
                   rows_uploaded, status, error_message, uploaded_at
            FROM upload_history
            WHERE (?1 IS NULL OR entity = ?1)
            ORDER BY uploaded_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt
            .query_map(params![filter, limit], map_history_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn map_history_row(row: &Row<'_>) -> rusqlite::Result<UploadHistory> {
    let status: String = row.get(6)?;
    let uploaded_at: String = row.get(8)?;
    let uploaded_at = DateTime::parse_from_rfc3339(&uploaded_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(UploadHistory {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        entity: row.get(2)?,
        file_name: row.get(3)?,
        file_path: row.get(4)?,
        rows_uploaded: row.get(5)?,
        status: UploadStatus::parse(&status),
        error_message: row.get(7)?,
        uploaded_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_repo() -> UploadHistoryRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        UploadHistoryRepository::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_create_then_mark_success() {
        let repo = setup_repo();
        let h = repo.create("b1", "HQ", "sales.xlsx").unwrap();
        assert_eq!(h.status, UploadStatus::Processing);

        repo.mark_success(&h.id, 42, Some("3 rows skipped")).unwrap();

        let loaded = repo.find_by_id(&h.id).unwrap().unwrap();
        assert_eq!(loaded.status, UploadStatus::Success);
        assert_eq!(loaded.rows_uploaded, Some(42));
        assert_eq!(loaded.error_message.as_deref(), Some("3 rows skipped"));
        assert_eq!(loaded.file_name, "sales.xlsx");
    }

    #[test]
    fn test_mark_failed_keeps_message() {
        let repo = setup_repo();
        let h = repo.create("b1", "Japan", "bad.xlsx").unwrap();
        repo.mark_failed(&h.id, "File is empty").unwrap();

        let loaded = repo.find_by_id(&h.id).unwrap().unwrap();
        assert_eq!(loaded.status, UploadStatus::Failed);
        assert_eq!(loaded.rows_uploaded, None);
        assert_eq!(loaded.error_message.as_deref(), Some("File is empty"));
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let repo = setup_repo();
        let result = repo.mark_failed("missing", "x");
        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
    }

    #[test]
    fn test_list_filters_and_orders_newest_first() {
        let repo = setup_repo();
        let first = repo.create("b1", "HQ", "a.xlsx").unwrap();
        let _other = repo.create("b2", "USA", "b.xlsx").unwrap();
        let last = repo.create("b3", "HQ", "c.xlsx").unwrap();

        let hq = repo.list(Some("HQ"), 50).unwrap();
        assert_eq!(hq.len(), 2);
        assert_eq!(hq[0].id, last.id);
        assert_eq!(hq[1].id, first.id);

        assert_eq!(repo.list(Some(ALL_ENTITIES), 50).unwrap().len(), 3);
        assert_eq!(repo.list(None, 2).unwrap().len(), 2);
    }
}
