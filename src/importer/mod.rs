// ==========================================
// 销售分析看板 - 导入层
// ==========================================
// 职责: 表格文件 → 原始行 → 校验 → 标准化销售记录 / 年度汇率
// 支持: Excel 系列 (.xlsx/.xlsm/.xlsb/.xls/.ods), CSV
// ==========================================

// 模块声明
pub mod column_detector;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod rate_extractor;
pub mod row_validator;
pub mod sales_importer_impl;
pub mod sales_importer_trait;
pub mod type_coercer;

// 重导出核心类型
pub use column_detector::{ColumnDetector, DetectedColumns};
pub use error::{ImportError, ImportResult};
pub use field_mapper::{ColumnMapping, SalesFieldMapper};
pub use file_parser::{CsvParser, ExcelParser, FileParser, UniversalFileParser};
pub use rate_extractor::ExchangeRateExtractor;
pub use row_validator::RowValidator;
pub use sales_importer_impl::SalesImporterImpl;
pub use type_coercer::{amount_or_zero, sum_tolerant, TypeCoercer};

// 重导出 Trait 接口
pub use sales_importer_trait::{FieldMapper, ImportOutcome, SalesImporter};
