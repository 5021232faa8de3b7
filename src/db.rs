// ==========================================
// 销售分析看板 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表: sales_data / upload_history / column_mapping / exchange_rate / schema_version
// - 去重索引只覆盖有发票号的行；无发票号的行互不冲突
// ==========================================

use crate::domain::{CanonicalField, FieldKind};
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 2;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 标准字段的 SQL 列类型
fn sql_type(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Number => "REAL",
        FieldKind::Text | FieldKind::Date => "TEXT",
    }
}

/// sales_data 建表语句（列由标准字段目录生成）
pub fn sales_data_ddl() -> String {
    let field_columns: Vec<String> = CanonicalField::ALL
        .iter()
        .map(|f| format!("    \"{}\" {}", f.as_str(), sql_type(f.kind())))
        .collect();

    format!(
        r#"
CREATE TABLE IF NOT EXISTS sales_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity TEXT NOT NULL,
    year INTEGER,
    quarter TEXT,
    month INTEGER,
{},
    upload_batch_id TEXT,
    created_at TEXT NOT NULL
);
DROP INDEX IF EXISTS ux_sales_data_identity;
CREATE UNIQUE INDEX IF NOT EXISTS ux_sales_data_invoice_line ON sales_data (
    entity,
    "invoice",
    COALESCE("item_number", ''),
    COALESCE("line_number", '')
) WHERE "invoice" IS NOT NULL;
CREATE INDEX IF NOT EXISTS ix_sales_data_entity_year ON sales_data (entity, year, quarter);
"#,
        field_columns.join(",\n")
    )
}

const SUPPORT_TABLES_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS upload_history (
    id TEXT PRIMARY KEY,
    batch_id TEXT NOT NULL,
    entity TEXT NOT NULL,
    file_name TEXT NOT NULL,
    file_path TEXT,
    rows_uploaded INTEGER,
    status TEXT NOT NULL CHECK (status IN ('processing', 'success', 'failed')),
    error_message TEXT,
    uploaded_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS ix_upload_history_entity ON upload_history (entity, uploaded_at);

CREATE TABLE IF NOT EXISTS column_mapping (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity TEXT NOT NULL,
    excel_column TEXT NOT NULL,
    db_column TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (entity, excel_column, db_column)
);

CREATE TABLE IF NOT EXISTS exchange_rate (
    year INTEGER NOT NULL,
    currency TEXT NOT NULL,
    rate REAL NOT NULL CHECK (rate > 0),
    updated_at TEXT NOT NULL,
    PRIMARY KEY (year, currency)
);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// 建表（幂等）并登记 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(&sales_data_ddl())?;
    conn.execute_batch(SUPPORT_TABLES_DDL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        [CURRENT_SCHEMA_VERSION],
    )?;

    if let Some(v) = read_schema_version(conn)? {
        if v != CURRENT_SCHEMA_VERSION {
            tracing::warn!(
                expected = CURRENT_SCHEMA_VERSION,
                actual = v,
                "schema_version 与当前代码不一致"
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_sales_data_has_every_canonical_column() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('sales_data')").unwrap();
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        for field in CanonicalField::ALL {
            assert!(columns.iter().any(|c| c == field.as_str()), "missing {}", field);
        }
    }

    #[test]
    fn test_read_schema_version_without_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }
}
