// ==========================================
// 销售分析看板 - 销售数据仓储（持久化适配器）
// ==========================================
// 职责: SalesRecord → sales_data 表
// 策略: 单事务内逐行 INSERT；唯一索引冲突计为跳过，其它错误整批回滚
// 线程: 异步接口在 blocking 线程池上执行 SQLite 调用，不占用运行时工作线程
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::{CanonicalField, FieldValue, PersistOutcome, SalesRecord};
use crate::perf::PerfGuard;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

// ==========================================
// SalesDataSink Trait
// ==========================================
// 用途: 导入管道的落库边界
// 实现者: SalesRepository（使用 rusqlite）
#[async_trait]
pub trait SalesDataSink: Send + Sync {
    /// 写入一批标准化销售记录
    ///
    /// # 返回
    /// - Ok(PersistOutcome): 插入数 / 重复跳过数
    /// - Err: 非唯一约束类数据库错误（整个事务回滚）
    async fn insert_records(
        &self,
        batch_id: &str,
        records: Vec<SalesRecord>,
    ) -> RepositoryResult<PersistOutcome>;

    /// 有数据的实体（去重，升序）
    async fn distinct_entities(&self) -> RepositoryResult<Vec<String>>;
}

// ==========================================
// SalesRepository
// ==========================================
pub struct SalesRepository {
    conn: Arc<Mutex<Connection>>,
    insert_sql: Arc<str>,
}

impl SalesRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            insert_sql: build_insert_sql().into(),
        }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        lock_conn(&self.conn)
    }

    /// 某实体的行数
    pub fn count_by_entity(&self, entity: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM sales_data WHERE entity = ?1",
            [entity],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 某批次的行金额合计（NULL 按 0 计）
    pub fn sum_line_amount_by_batch(&self, batch_id: &str) -> RepositoryResult<f64> {
        let conn = self.get_conn()?;
        let total = conn.query_row(
            "SELECT COALESCE(SUM(line_amount_mst), 0) FROM sales_data WHERE upload_batch_id = ?1",
            [batch_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }
}

fn lock_conn(conn: &Mutex<Connection>) -> RepositoryResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| RepositoryError::LockError(e.to_string()))
}

fn insert_records_sync(
    conn: &Mutex<Connection>,
    insert_sql: &str,
    batch_id: &str,
    records: &[SalesRecord],
) -> RepositoryResult<PersistOutcome> {
    let _perf = PerfGuard::new("sales_repo.insert_records");
    let mut conn = lock_conn(conn)?;
    let tx = conn.transaction()?;
    let created_at = Utc::now().to_rfc3339();

    let mut outcome = PersistOutcome::default();
    {
        let mut stmt = tx.prepare(insert_sql)?;
        for record in records {
            let values = row_values(record, batch_id, &created_at);
            match stmt.execute(params_from_iter(values)) {
                Ok(_) => outcome.inserted += 1,
                Err(e) => {
                    let err = RepositoryError::from(e);
                    if !err.is_unique_violation() {
                        return Err(err);
                    }
                    debug!(row = record.source_row, "重复行，跳过");
                    outcome.skipped += 1;
                }
            }
        }
    }

    tx.commit()?;
    info!(
        batch_id,
        inserted = outcome.inserted,
        skipped = outcome.skipped,
        "销售数据落库完成"
    );
    Ok(outcome)
}

fn distinct_entities_sync(conn: &Mutex<Connection>) -> RepositoryResult<Vec<String>> {
    let _perf = PerfGuard::new("sales_repo.distinct_entities");
    let conn = lock_conn(conn)?;
    let mut stmt = conn.prepare("SELECT DISTINCT entity FROM sales_data ORDER BY entity")?;
    let entities = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entities)
}

/// 在 blocking 线程池上执行同步仓储调用
async fn run_blocking<T, F>(f: F) -> RepositoryResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> RepositoryResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RepositoryError::InternalError(format!("Blocking task failed: {}", e)))?
}

#[async_trait]
impl SalesDataSink for SalesRepository {
    async fn insert_records(
        &self,
        batch_id: &str,
        records: Vec<SalesRecord>,
    ) -> RepositoryResult<PersistOutcome> {
        let conn = Arc::clone(&self.conn);
        let insert_sql = Arc::clone(&self.insert_sql);
        let batch_id = batch_id.to_string();
        run_blocking(move || insert_records_sync(&conn, &insert_sql, &batch_id, &records)).await
    }

    async fn distinct_entities(&self) -> RepositoryResult<Vec<String>> {
        let conn = Arc::clone(&self.conn);
        run_blocking(move || distinct_entities_sync(&conn)).await
    }
}

/// INSERT 语句：entity, year, quarter, month, <标准字段...>, upload_batch_id, created_at
fn build_insert_sql() -> String {
    let mut columns = vec![
        "entity".to_string(),
        "year".to_string(),
        "quarter".to_string(),
        "month".to_string(),
    ];
    columns.extend(CanonicalField::ALL.iter().map(|f| format!("\"{}\"", f.as_str())));
    columns.push("upload_batch_id".to_string());
    columns.push("created_at".to_string());

    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO sales_data ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    )
}

fn field_value(value: Option<&FieldValue>) -> Value {
    match value {
        Some(FieldValue::Date(d)) => Value::Text(d.format("%Y-%m-%d").to_string()),
        Some(FieldValue::Number(n)) if n.is_finite() => Value::Real(*n),
        Some(FieldValue::Number(_)) => Value::Null,
        Some(FieldValue::Text(s)) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

/// 参数顺序与 build_insert_sql 一致
fn row_values(record: &SalesRecord, batch_id: &str, created_at: &str) -> Vec<Value> {
    let mut values = Vec::with_capacity(CanonicalField::ALL.len() + 6);
    values.push(Value::Text(record.entity.as_str().to_string()));
    values.push(record.year.map_or(Value::Null, |y| Value::Integer(i64::from(y))));
    values.push(
        record
            .quarter
            .map_or(Value::Null, |q| Value::Text(q.as_str().to_string())),
    );
    values.push(record.month.map_or(Value::Null, |m| Value::Integer(i64::from(m))));
    values.extend(CanonicalField::ALL.iter().map(|f| field_value(record.get(*f))));
    values.push(Value::Text(batch_id.to_string()));
    values.push(Value::Text(created_at.to_string()));
    values
}
