// ==========================================
// 销售分析看板 - 字段映射器实现
// ==========================================
// 职责: 源表头 → 标准字段映射 + 类型转换
// 规则:
// - 映射为有序列表（表头, 标准字段），同一标准字段先出现且有值者优先
// - 日期字段 → ISO 日期；数值字段 → f64（NaN 存为空）；其余 → 去空白文本
// - year / quarter / month 由 invoice_date 派生
// ==========================================

use crate::domain::{
    CanonicalField, CellValue, ColumnMappingEntry, Entity, FieldKind, FieldValue, RawRow,
    SalesRecord,
};
use crate::importer::sales_importer_trait::FieldMapper as FieldMapperTrait;
use crate::importer::type_coercer::TypeCoercer;
use std::collections::HashMap;

// ==========================================
// ColumnMapping - 有序表头映射
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    entries: Vec<(String, CanonicalField)>,
}

impl ColumnMapping {
    /// 默认映射：按字段目录顺序展开每个字段的表头别名
    pub fn default_mapping() -> Self {
        let entries = CanonicalField::ALL
            .iter()
            .flat_map(|field| {
                field
                    .header_aliases()
                    .iter()
                    .map(move |alias| (alias.to_string(), *field))
            })
            .collect();
        Self { entries }
    }

    /// 由已保存的映射构建（只取启用项，保持传入顺序）
    pub fn from_saved(saved: &[ColumnMappingEntry]) -> Self {
        let entries = saved
            .iter()
            .filter(|e| e.is_active)
            .map(|e| (e.excel_column.clone(), e.db_column))
            .collect();
        Self { entries }
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, CanonicalField)>,
        S: Into<String>,
    {
        Self {
            entries: pairs.into_iter().map(|(h, f)| (h.into(), f)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, CanonicalField)> {
        self.entries.iter().map(|(h, f)| (h.as_str(), *f))
    }

    /// 表头 → 标准字段（第一条匹配）
    pub fn field_for(&self, header: &str) -> Option<CanonicalField> {
        self.entries
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, f)| *f)
    }

    /// 以 JSON 对象形式输出 { excel_column: db_column }
    pub fn to_map(&self) -> HashMap<String, String> {
        self.entries
            .iter()
            .map(|(h, f)| (h.clone(), f.as_str().to_string()))
            .collect()
    }
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self::default_mapping()
    }
}

// ==========================================
// SalesFieldMapper
// ==========================================
pub struct SalesFieldMapper {
    coercer: TypeCoercer,
}

impl Default for SalesFieldMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl SalesFieldMapper {
    pub fn new() -> Self {
        Self {
            coercer: TypeCoercer,
        }
    }

    /// 单元格按字段类型转换；无法转换时返回 None（落库为 NULL）
    fn coerce(&self, kind: FieldKind, value: &CellValue) -> Option<FieldValue> {
        match kind {
            FieldKind::Date => self.coercer.coerce_iso_date(value).map(FieldValue::Date),
            FieldKind::Number => {
                let n = self.coercer.parse_number(value);
                if n.is_nan() {
                    None
                } else {
                    Some(FieldValue::Number(n))
                }
            }
            FieldKind::Text => value.as_text().map(FieldValue::Text),
        }
    }
}

impl FieldMapperTrait for SalesFieldMapper {
    fn map_row(
        &self,
        row: &RawRow,
        mapping: &ColumnMapping,
        entity: Entity,
        row_number: usize,
    ) -> SalesRecord {
        let mut record = SalesRecord::new(entity, row_number);

        for (header, field) in mapping.iter() {
            if record.values.contains_key(&field) {
                continue;
            }
            let Some(value) = row.get(header).filter(|v| v.is_present()) else {
                continue;
            };
            if let Some(coerced) = self.coerce(field.kind(), value) {
                record.values.insert(field, coerced);
            }
        }

        // 派生字段
        if let Some(date) = record.date(CanonicalField::InvoiceDate) {
            let (year, quarter, month) = self.coercer.derive_period(date);
            record.year = Some(year);
            record.quarter = Some(quarter);
            record.month = Some(month);
        }

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Quarter;
    use chrono::{NaiveDate, Utc};

    fn raw(cells: &[(&str, CellValue)]) -> RawRow {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_default_mapping_alias_priority() {
        let mapping = ColumnMapping::default_mapping();
        assert_eq!(mapping.field_for("Invoice date"), Some(CanonicalField::InvoiceDate));
        assert_eq!(mapping.field_for("Date"), Some(CanonicalField::InvoiceDate));
        assert_eq!(mapping.field_for("Sales Amount"), Some(CanonicalField::LineAmountMst));
        assert_eq!(mapping.field_for("Unknown header"), None);
    }

    #[test]
    fn test_map_row_coerces_by_kind() {
        let row = raw(&[
            ("Invoice date", CellValue::Number(45306.0)),
            ("Invoice", CellValue::from("INV001")),
            ("Quantity", CellValue::from("1,200")),
            ("Line Amount_MST", CellValue::from("$1,234.56")),
            ("Net amount", CellValue::from("N/A")),
            ("Line number", CellValue::Number(3.0)),
            ("Ignored column", CellValue::from("x")),
        ]);

        let record = SalesFieldMapper::new().map_row(
            &row,
            &ColumnMapping::default_mapping(),
            Entity::Hq,
            2,
        );

        assert_eq!(
            record.date(CanonicalField::InvoiceDate),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(record.text(CanonicalField::Invoice), Some("INV001"));
        assert_eq!(record.number(CanonicalField::Quantity), Some(1200.0));
        assert_eq!(record.number(CanonicalField::LineAmountMst), Some(1234.56));
        // NaN 不落库
        assert!(record.get(CanonicalField::NetAmount).is_none());
        assert_eq!(record.text(CanonicalField::LineNumber), Some("3"));
        assert_eq!(record.values.len(), 5);

        assert_eq!(record.year, Some(2024));
        assert_eq!(record.quarter, Some(Quarter::Q1));
        assert_eq!(record.month, Some(1));
        assert_eq!(record.source_row, 2);
    }

    #[test]
    fn test_first_present_alias_wins() {
        let row = raw(&[
            ("Invoice date", CellValue::from("  ")),
            ("Date", CellValue::from("2024-05-02")),
            ("Invoice Date", CellValue::from("2023-01-01")),
        ]);

        let record =
            SalesFieldMapper::new().map_row(&row, &ColumnMapping::default(), Entity::Japan, 2);
        assert_eq!(
            record.date(CanonicalField::InvoiceDate),
            NaiveDate::from_ymd_opt(2024, 5, 2)
        );
        assert_eq!(record.quarter, Some(Quarter::Q2));
    }

    #[test]
    fn test_unparseable_invoice_date_leaves_period_empty() {
        let row = raw(&[("Invoice date", CellValue::from("soon"))]);
        let record =
            SalesFieldMapper::new().map_row(&row, &ColumnMapping::default(), Entity::Usa, 2);
        assert!(record.get(CanonicalField::InvoiceDate).is_none());
        assert!(record.year.is_none());
        assert!(record.quarter.is_none());
    }

    #[test]
    fn test_saved_mapping_only_uses_active_entries() {
        let now = Utc::now();
        let entry = |col: &str, field, active| ColumnMappingEntry {
            id: 0,
            entity: "Korot".to_string(),
            excel_column: col.to_string(),
            db_column: field,
            is_active: active,
            created_at: now,
            updated_at: now,
        };
        let mapping = ColumnMapping::from_saved(&[
            entry("Bill No", CanonicalField::Invoice, true),
            entry("Old Bill", CanonicalField::Invoice, false),
        ]);
        assert_eq!(mapping.len(), 1);

        let row = raw(&[
            ("Bill No", CellValue::from("B-7")),
            ("Invoice", CellValue::from("ignored")),
        ]);
        let record = SalesFieldMapper::new().map_row(&row, &mapping, Entity::Korot, 2);
        assert_eq!(record.text(CanonicalField::Invoice), Some("B-7"));
        assert_eq!(record.values.len(), 1);
    }
}
