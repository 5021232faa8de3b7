// ==========================================
// 销售分析看板 - 销售数据导入器实现
// ==========================================
// 职责: 整合导入流程，从文件到数据库
// 流程: 解析 → 校验 → 映射/转换 → 剔除无主键行 → 落库 → 上传历史
// ==========================================

use crate::domain::{CanonicalField, Entity, ImportSummary, SalesRecord, ValidationResult};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{ColumnMapping, SalesFieldMapper};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::row_validator::RowValidator;
use crate::importer::sales_importer_trait::{FieldMapper, ImportOutcome, SalesImporter};
use crate::importer::type_coercer::sum_tolerant;
use crate::repository::{SalesDataSink, UploadHistoryRepository};
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// SalesImporterImpl - 销售数据导入器实现
// ==========================================
pub struct SalesImporterImpl<S>
where
    S: SalesDataSink,
{
    // 数据访问层
    sink: Arc<S>,
    history_repo: Arc<UploadHistoryRepository>,

    // 导入组件
    file_parser: UniversalFileParser,
    validator: RowValidator,
    field_mapper: Box<dyn FieldMapper>,
}

impl<S> SalesImporterImpl<S>
where
    S: SalesDataSink,
{
    pub fn new(sink: Arc<S>, history_repo: Arc<UploadHistoryRepository>) -> Self {
        Self::with_mapper(sink, history_repo, Box::new(SalesFieldMapper::new()))
    }

    pub fn with_mapper(
        sink: Arc<S>,
        history_repo: Arc<UploadHistoryRepository>,
        field_mapper: Box<dyn FieldMapper>,
    ) -> Self {
        Self {
            sink,
            history_repo,
            file_parser: UniversalFileParser,
            validator: RowValidator::new(),
            field_mapper,
        }
    }

    /// 历史记录已创建之后的全部步骤
    async fn run_pipeline(
        &self,
        batch_id: &str,
        history_id: &str,
        file_name: &str,
        bytes: &[u8],
        entity: Entity,
        mapping: ColumnMapping,
    ) -> ImportResult<ImportOutcome> {
        let start = Instant::now();

        // === 步骤 1: 解析文件 ===
        debug!("步骤 1: 解析文件");
        let raw_rows = self.file_parser.parse(file_name, bytes)?;
        let rows_parsed = raw_rows.len();
        if rows_parsed == 0 {
            return Err(ImportError::NoDataRows);
        }
        info!(rows = rows_parsed, "文件解析完成");

        // === 步骤 2: 行校验 ===
        debug!("步骤 2: 行校验");
        let validation = self.validator.validate(&raw_rows, entity.as_str());
        if !validation.valid {
            let first = validation
                .errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_default();
            warn!(errors = validation.errors.len(), first = %first, "行校验未通过");
            self.history_repo.mark_failed(history_id, &first)?;
            return Ok(ImportOutcome::Rejected(validation));
        }

        // === 步骤 3: 字段映射与类型转换 ===
        debug!(mapping = mapping.len(), "步骤 3: 字段映射");
        let mapped: Vec<SalesRecord> = raw_rows
            .iter()
            .enumerate()
            .map(|(idx, row)| self.field_mapper.map_row(row, &mapping, entity, idx + 2))
            .collect();
        drop(raw_rows);

        // === 步骤 4: 剔除无主键行 ===
        let records: Vec<SalesRecord> = mapped.into_iter().filter(|r| r.has_identity()).collect();
        let rows_mapped = records.len();
        if rows_mapped < rows_parsed {
            info!(dropped = rows_parsed - rows_mapped, "剔除无主键行");
        }

        let total_line_amount = sum_tolerant(
            records
                .iter()
                .map(|r| r.number(CanonicalField::LineAmountMst).unwrap_or(f64::NAN)),
        );

        // === 步骤 5: 落库 ===
        debug!("步骤 5: 落库");
        let outcome = self.sink.insert_records(batch_id, records).await?;

        let note = (outcome.skipped > 0).then(|| format!("{} rows skipped", outcome.skipped));
        self.history_repo.mark_success(
            history_id,
            i64::try_from(outcome.inserted).unwrap_or(i64::MAX),
            note.as_deref(),
        )?;

        let summary = ImportSummary {
            batch_id: batch_id.to_string(),
            history_id: history_id.to_string(),
            entity,
            rows_parsed,
            rows_mapped,
            rows_inserted: outcome.inserted,
            rows_skipped: outcome.skipped,
            total_line_amount,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            inserted = summary.rows_inserted,
            skipped = summary.rows_skipped,
            elapsed_ms = summary.elapsed_ms,
            "导入完成"
        );
        Ok(ImportOutcome::Imported(summary))
    }
}

#[async_trait]
impl<S> SalesImporter for SalesImporterImpl<S>
where
    S: SalesDataSink + 'static,
{
    #[instrument(skip(self, bytes, mapping), fields(size = bytes.len(), batch_id))]
    async fn import(
        &self,
        file_name: &str,
        bytes: &[u8],
        entity: &str,
        mapping: Option<ColumnMapping>,
    ) -> ImportResult<ImportOutcome> {
        let entity =
            Entity::from_str(entity).map_err(|_| ImportError::InvalidEntity(entity.to_string()))?;

        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());

        let history = self.history_repo.create(&batch_id, entity.as_str(), file_name)?;
        info!(entity = %entity, file_name, "开始导入销售数据");

        let mapping = mapping.unwrap_or_default();
        let result = self
            .run_pipeline(&batch_id, &history.id, file_name, bytes, entity, mapping)
            .await;

        if let Err(e) = &result {
            error!(error = %e, "导入失败");
            if let Err(history_err) = self.history_repo.mark_failed(&history.id, &e.to_string()) {
                warn!(error = %history_err, "上传历史更新失败");
            }
        }

        result
    }

    fn validate_only(
        &self,
        file_name: &str,
        bytes: &[u8],
        entity: &str,
    ) -> ImportResult<ValidationResult> {
        let rows = self.file_parser.parse(file_name, bytes)?;
        Ok(self.validator.validate(&rows, entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PersistOutcome, UploadStatus};
    use crate::repository::{RepositoryError, RepositoryResult};
    use rusqlite::Connection;
    use std::sync::Mutex;

    /// 记录写入内容的内存 Sink
    #[derive(Default)]
    struct MemorySink {
        written: Mutex<Vec<SalesRecord>>,
        fail: bool,
    }

    #[async_trait]
    impl SalesDataSink for MemorySink {
        async fn insert_records(
            &self,
            _batch_id: &str,
            records: Vec<SalesRecord>,
        ) -> RepositoryResult<PersistOutcome> {
            if self.fail {
                return Err(RepositoryError::DatabaseQueryError("disk full".to_string()));
            }
            let inserted = records.len();
            self.written.lock().unwrap().extend(records);
            Ok(PersistOutcome {
                inserted,
                skipped: 0,
            })
        }

        async fn distinct_entities(&self) -> RepositoryResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn setup(sink: MemorySink) -> (SalesImporterImpl<MemorySink>, Arc<UploadHistoryRepository>) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        let history = Arc::new(UploadHistoryRepository::new(Arc::new(Mutex::new(conn))));
        (SalesImporterImpl::new(Arc::new(sink), history.clone()), history)
    }

    const CSV_OK: &str = "Invoice date,Invoice,Item number,Line Amount_MST\n\
2024-01-15,INV001,A-1,\"$1,000.50\"\n\
2024-02-20,INV002,A-2,N/A\n\
2024-03-01,,,5\n";

    #[tokio::test]
    async fn test_import_csv_success() {
        let (importer, history) = setup(MemorySink::default());

        let outcome = importer
            .import("sales.csv", CSV_OK.as_bytes(), "HQ", None)
            .await
            .unwrap();

        let ImportOutcome::Imported(summary) = outcome else {
            panic!("expected import to succeed");
        };
        assert_eq!(summary.rows_parsed, 3);
        // 第 3 行无发票号/物料号/销售类型，被剔除
        assert_eq!(summary.rows_mapped, 2);
        assert_eq!(summary.rows_inserted, 2);
        assert_eq!(summary.total_line_amount, 1000.5);

        let h = history.find_by_id(&summary.history_id).unwrap().unwrap();
        assert_eq!(h.status, UploadStatus::Success);
        assert_eq!(h.rows_uploaded, Some(2));
        assert_eq!(h.batch_id, summary.batch_id);
    }

    #[tokio::test]
    async fn test_import_rejected_by_validation() {
        let (importer, history) = setup(MemorySink::default());
        let csv = "Invoice date,Invoice\n2024-13-45,INV001\n";

        let outcome = importer
            .import("sales.csv", csv.as_bytes(), "USA", None)
            .await
            .unwrap();

        let ImportOutcome::Rejected(validation) = outcome else {
            panic!("expected validation failure");
        };
        assert_eq!(validation.errors[0].row, 2);

        let listed = history.list(Some("USA"), 10).unwrap();
        assert_eq!(listed[0].status, UploadStatus::Failed);
        assert_eq!(
            listed[0].error_message.as_deref(),
            Some("Invalid date format: 2024-13-45")
        );
    }

    #[tokio::test]
    async fn test_import_invalid_entity_creates_no_history() {
        let (importer, history) = setup(MemorySink::default());

        let result = importer
            .import("sales.csv", CSV_OK.as_bytes(), "Atlantis", None)
            .await;

        assert!(matches!(result, Err(ImportError::InvalidEntity(_))));
        assert!(history.list(None, 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_header_only_file_is_empty() {
        let (importer, history) = setup(MemorySink::default());

        let result = importer
            .import("sales.csv", b"Invoice date,Invoice\n", "HQ", None)
            .await;

        assert!(matches!(result, Err(ImportError::NoDataRows)));
        let listed = history.list(None, 10).unwrap();
        assert_eq!(listed[0].status, UploadStatus::Failed);
        assert_eq!(listed[0].error_message.as_deref(), Some("File is empty"));
    }

    #[tokio::test]
    async fn test_import_persist_failure_marks_history_failed() {
        let (importer, history) = setup(MemorySink {
            fail: true,
            ..Default::default()
        });

        let result = importer
            .import("sales.csv", CSV_OK.as_bytes(), "HQ", None)
            .await;

        assert!(matches!(result, Err(ImportError::PersistError(_))));
        let listed = history.list(None, 10).unwrap();
        assert_eq!(listed[0].status, UploadStatus::Failed);
        assert!(listed[0]
            .error_message
            .as_deref()
            .unwrap_or_default()
            .contains("disk full"));
    }

    #[tokio::test]
    async fn test_import_with_custom_mapping() {
        let sink = MemorySink::default();
        let (importer, _history) = setup(sink);
        let csv = "Invoice,Bill Amount\nINV9,\"1,234\"\n";
        let mapping = ColumnMapping::from_pairs([
            ("Invoice", CanonicalField::Invoice),
            ("Bill Amount", CanonicalField::LineAmountMst),
        ]);

        let outcome = importer
            .import("custom.csv", csv.as_bytes(), "Korot", Some(mapping))
            .await
            .unwrap();

        let ImportOutcome::Imported(summary) = outcome else {
            panic!("expected import to succeed");
        };
        assert_eq!(summary.total_line_amount, 1234.0);
        assert_eq!(summary.entity, Entity::Korot);
    }

    #[test]
    fn test_validate_only_reports_invalid_entity_as_row_zero() {
        let (importer, _history) = setup(MemorySink::default());
        let result = importer
            .validate_only("sales.csv", CSV_OK.as_bytes(), "Mars")
            .unwrap();
        assert!(!result.valid);
        assert_eq!(result.errors[0].row, 0);
        assert_eq!(result.errors[0].field, "entity");
    }
}
