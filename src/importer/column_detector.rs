// ==========================================
// 销售分析看板 - 列检测器
// ==========================================
// 职责: 读取表头行 + 附带标准字段目录，原样返回给调用方核对
// 不做自动/模糊匹配（由界面侧完成）
// ==========================================

use crate::domain::{CanonicalField, CellValue};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::UniversalFileParser;
use serde::Serialize;
use tracing::{debug, instrument};

/// 列检测结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedColumns {
    /// 文件表头（已去除空值，保持原顺序）
    pub excel_columns: Vec<String>,
    /// 标准字段目录
    pub db_columns: Vec<&'static str>,
}

pub struct ColumnDetector {
    parser: UniversalFileParser,
}

impl Default for ColumnDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnDetector {
    pub fn new() -> Self {
        Self {
            parser: UniversalFileParser,
        }
    }

    /// 从文件字节检测表头
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub fn detect(&self, file_name: &str, bytes: &[u8]) -> ImportResult<DetectedColumns> {
        let header_cells = self.parser.read_header_cells(file_name, bytes)?;
        let detected = Self::from_header_cells(&header_cells)?;
        debug!(columns = detected.excel_columns.len(), "表头检测完成");
        Ok(detected)
    }

    /// 表头单元格 → 检测结果
    ///
    /// # 返回
    /// - Err(EmptyFile): 表头行不存在或全部为空
    pub fn from_header_cells(cells: &[CellValue]) -> ImportResult<DetectedColumns> {
        let excel_columns: Vec<String> = cells.iter().filter_map(CellValue::as_text).collect();

        if excel_columns.is_empty() {
            return Err(ImportError::EmptyFile);
        }

        Ok(DetectedColumns {
            excel_columns,
            db_columns: CanonicalField::catalog(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_headers_are_filtered() {
        let cells = vec![
            CellValue::from("Invoice date"),
            CellValue::Empty,
            CellValue::from("  "),
            CellValue::from("Invoice"),
            CellValue::Number(2024.0),
        ];

        let detected = ColumnDetector::from_header_cells(&cells).unwrap();
        assert_eq!(detected.excel_columns, vec!["Invoice date", "Invoice", "2024"]);
        assert_eq!(detected.db_columns.len(), CanonicalField::ALL.len());
        assert_eq!(detected.db_columns[0], "sales_type");
    }

    #[test]
    fn test_empty_header_row_is_error() {
        let result = ColumnDetector::from_header_cells(&[CellValue::Empty]);
        assert!(matches!(result, Err(ImportError::EmptyFile)));

        let result = ColumnDetector::from_header_cells(&[]);
        assert!(matches!(result, Err(ImportError::EmptyFile)));
    }

    #[test]
    fn test_detect_from_csv() {
        let csv = "Invoice date,,Currency\n2024-01-15,x,USD\n";
        let detected = ColumnDetector::new()
            .detect("export.csv", csv.as_bytes())
            .unwrap();
        assert_eq!(detected.excel_columns, vec!["Invoice date", "Currency"]);
    }

    #[test]
    fn test_json_shape() {
        let detected = ColumnDetector::from_header_cells(&[CellValue::from("Invoice")]).unwrap();
        let json = serde_json::to_value(&detected).unwrap();
        assert!(json["excelColumns"].is_array());
        assert!(json["dbColumns"].is_array());
    }
}
