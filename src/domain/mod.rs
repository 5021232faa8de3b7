// ==========================================
// 销售分析看板 - 领域层
// ==========================================
// 职责: 实体、标准字段目录、导入数据模型、汇率
// ==========================================

pub mod canonical;
pub mod exchange_rate;
pub mod sales;
pub mod types;

// 重导出核心类型
pub use canonical::{CanonicalField, FieldKind, ANCHOR_HEADERS};
pub use exchange_rate::{
    ExchangeRate, RateExtraction, SkippedRateRow, StoredExchangeRate, RATE_YEAR_RANGE,
};
pub use sales::{
    ColumnMappingEntry, FieldValue, ImportSummary, PersistOutcome, RawRow, SalesRecord,
    UploadHistory, UploadStatus, ValidationError, ValidationResult,
};
pub use types::{CellValue, Entity, Quarter, UnknownEntity};
