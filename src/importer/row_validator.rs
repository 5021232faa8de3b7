// ==========================================
// 销售分析看板 - 行校验器实现
// ==========================================
// 职责: 结构前置检查 + 日期字段逐行校验
// 原则: 收集全部错误，不在第一处失败时中止
// 顺序:
// 1. 实体（row 0，不短路）
// 2. 空数据（row 0，立即返回）
// 3. 锚点表头（row 0，只看第一行）
// 4. 逐行: 开票日期 → 到期日期
// ==========================================

use crate::domain::{CanonicalField, CellValue, Entity, RawRow, ValidationError, ValidationResult};
use crate::domain::ANCHOR_HEADERS;
use crate::importer::type_coercer::TypeCoercer;
use std::str::FromStr;
use tracing::debug;

/// 表头占第 1 行，数据行从第 2 行开始
const FIRST_DATA_ROW: usize = 2;

pub struct RowValidator {
    coercer: TypeCoercer,
}

impl Default for RowValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl RowValidator {
    pub fn new() -> Self {
        Self {
            coercer: TypeCoercer,
        }
    }

    /// 校验原始行
    ///
    /// # 参数
    /// - rows: 文件解析出的数据行（不含表头）
    /// - entity: 调用方提供的实体标识（未经校验的原始字符串）
    ///
    /// # 返回
    /// valid 当且仅当 errors 为空
    pub fn validate(&self, rows: &[RawRow], entity: &str) -> ValidationResult {
        let mut errors = Vec::new();

        if let Some(err) = Self::check_entity(entity) {
            errors.push(err);
        }

        if rows.is_empty() {
            errors.push(ValidationError::file_level(
                "data",
                "Excel file is empty or has no data rows",
            ));
            return ValidationResult::from_errors(errors);
        }

        if let Some(err) = Self::check_anchor_headers(&rows[0]) {
            errors.push(err);
        }

        for (idx, row) in rows.iter().enumerate() {
            errors.extend(self.check_row_dates(idx + FIRST_DATA_ROW, row));
        }

        debug!(rows = rows.len(), errors = errors.len(), "行校验完成");
        ValidationResult::from_errors(errors)
    }

    fn check_entity(entity: &str) -> Option<ValidationError> {
        Entity::from_str(entity)
            .err()
            .map(|e| ValidationError::file_level("entity", e.to_string()))
    }

    /// 锚点表头检查（启发式，只检查第一行的键）
    fn check_anchor_headers(first_row: &RawRow) -> Option<ValidationError> {
        let recognized = ANCHOR_HEADERS.iter().any(|h| first_row.contains_key(*h));
        if recognized {
            None
        } else {
            Some(ValidationError::file_level(
                "columns",
                "Excel file does not contain expected sales data columns. Please check the file format.",
            ))
        }
    }

    /// 单行日期校验：开票日期错误在前，到期日期错误在后
    ///
    /// 表头候选与字段映射共用标准字段目录的别名表；错误字段名取首个别名
    fn check_row_dates(&self, row_number: usize, row: &RawRow) -> Vec<ValidationError> {
        [
            (CanonicalField::InvoiceDate, "Invalid date format"),
            (CanonicalField::DueDate, "Invalid due date format"),
        ]
        .into_iter()
        .filter_map(|(field, message)| self.check_date_field(row_number, row, field, message))
        .collect()
    }

    fn check_date_field(
        &self,
        row_number: usize,
        row: &RawRow,
        field: CanonicalField,
        message: &str,
    ) -> Option<ValidationError> {
        let aliases = field.header_aliases();
        let value = aliases
            .iter()
            .filter_map(|key| row.get(*key))
            .find(|v| v.is_present())?;

        if self.coercer.coerce_date(value).is_some() {
            return None;
        }
        Some(ValidationError {
            row: row_number,
            field: aliases.first().copied().unwrap_or(field.as_str()).to_string(),
            message: format!("{}: {}", message, raw_text(value)),
        })
    }
}

/// 错误消息里回显的原始值
fn raw_text(value: &CellValue) -> String {
    value.to_string()
}
