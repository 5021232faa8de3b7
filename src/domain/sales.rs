// ==========================================
// 销售分析看板 - 销售导入领域模型
// ==========================================
// 职责: 原始行 / 校验结果 / 标准化销售记录 / 上传历史 / 列映射
// 对齐: sales_data / upload_history / column_mapping 表
// ==========================================

use crate::domain::canonical::CanonicalField;
use crate::domain::types::{CellValue, Entity, Quarter};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ==========================================
// RawRow - 原始行（表头 → 单元格值）
// ==========================================
// 每个数据行生成一次，类型转换后丢弃
pub type RawRow = HashMap<String, CellValue>;

// ==========================================
// 校验错误 / 校验结果
// ==========================================

/// 行级校验错误
///
/// - row = 0: 文件级错误（空文件 / 实体非法 / 无法识别的列）
/// - row = N (N >= 2): 对应表格第 N 行（表头占第 1 行）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub row: usize,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn file_level(field: &str, message: impl Into<String>) -> Self {
        Self {
            row: 0,
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn is_file_level(&self) -> bool {
        self.row == 0
    }
}

/// 校验结果：valid 当且仅当 errors 为空
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

// ==========================================
// FieldValue / SalesRecord - 标准化销售记录
// ==========================================

/// 类型转换后的字段值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Date(NaiveDate),
    Number(f64),
    Text(String),
}

/// 写入 sales_data 的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub entity: Entity,
    // ===== 由 invoice_date 派生 =====
    pub year: Option<i32>,
    pub quarter: Option<Quarter>,
    pub month: Option<u32>,
    // ===== 标准字段 =====
    pub values: BTreeMap<CanonicalField, FieldValue>,
    // ===== 元信息 =====
    pub source_row: usize,
}

impl SalesRecord {
    pub fn new(entity: Entity, source_row: usize) -> Self {
        Self {
            entity,
            year: None,
            quarter: None,
            month: None,
            values: BTreeMap::new(),
            source_row,
        }
    }

    pub fn get(&self, field: CanonicalField) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    pub fn text(&self, field: CanonicalField) -> Option<&str> {
        match self.values.get(&field) {
            Some(FieldValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn number(&self, field: CanonicalField) -> Option<f64> {
        match self.values.get(&field) {
            Some(FieldValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn date(&self, field: CanonicalField) -> Option<NaiveDate> {
        match self.values.get(&field) {
            Some(FieldValue::Date(d)) => Some(*d),
            _ => None,
        }
    }

    /// 是否含有可识别的业务主键（发票号 / 销售类型 / 物料号 至少其一）
    pub fn has_identity(&self) -> bool {
        [
            CanonicalField::Invoice,
            CanonicalField::SalesType,
            CanonicalField::ItemNumber,
        ]
        .iter()
        .any(|f| self.values.contains_key(f))
    }
}

// ==========================================
// UploadHistory - 上传历史
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Processing,
    Success,
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Processing => "processing",
            UploadStatus::Success => "success",
            UploadStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> UploadStatus {
        match raw {
            "processing" => UploadStatus::Processing,
            "success" => UploadStatus::Success,
            _ => UploadStatus::Failed,
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadHistory {
    pub id: String,
    pub batch_id: String,
    pub entity: String,
    pub file_name: String,
    pub file_path: Option<String>,
    pub rows_uploaded: Option<i64>,
    pub status: UploadStatus,
    pub error_message: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

// ==========================================
// ColumnMappingEntry - 已保存的列映射
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMappingEntry {
    pub id: i64,
    pub entity: String,
    pub excel_column: String,
    pub db_column: CanonicalField,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// ImportSummary - 导入汇总
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub batch_id: String,
    pub history_id: String,
    pub entity: Entity,
    /// 文件解析出的数据行数
    pub rows_parsed: usize,
    /// 映射后保留的行数（无主键行已剔除）
    pub rows_mapped: usize,
    pub rows_inserted: usize,
    /// 重复行（唯一索引冲突）
    pub rows_skipped: usize,
    /// 行金额合计（无法解析的金额按 0 计）
    pub total_line_amount: f64,
    pub elapsed_ms: u64,
}

/// 持久化写入结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistOutcome {
    pub inserted: usize,
    pub skipped: usize,
}
