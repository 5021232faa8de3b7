// ==========================================
// 销售分析看板 - 文件解析器实现
// ==========================================
// 阶段 0: 文件字节 → 原始行（表头 → 单元格值）
// 支持: Excel 系列 (.xlsx/.xlsm/.xlsb/.xls/.ods) / CSV (.csv)
// 规则:
// - 只读取第一个工作表，第一行作为表头
// - 空表头命名为 __EMPTY / __EMPTY_1 ...，重复表头追加 _1 / _2 ...（跳过已占用的名字）
// - 空单元格不进入原始行；整行为空时跳过
// - CSV 数据单元格形如数字时按数值读入，其余为文本
// ==========================================

use crate::domain::{CellValue, RawRow};
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use csv::ReaderBuilder;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 0）
// 实现者: ExcelParser, CsvParser
pub trait FileParser: Send + Sync {
    /// 解析为原始行列表（不含表头）
    ///
    /// # 返回
    /// - Ok(Vec<RawRow>): 数据行，可能为空（是否视为错误由调用方决定）
    /// - Err(ParseError/NoSheets): 无法识别的容器 / 无工作表
    fn parse_to_raw_rows(&self, bytes: &[u8]) -> ImportResult<Vec<RawRow>>;

    /// 读取表头行的原始单元格（工作表无任何行时返回空列表）
    fn read_header_cells(&self, bytes: &[u8]) -> ImportResult<Vec<CellValue>>;
}

// ==========================================
// 表头命名
// ==========================================

/// 生成唯一表头名
fn header_names(cells: &[CellValue]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut next_suffix: HashMap<String, usize> = HashMap::new();
    cells
        .iter()
        .map(|cell| {
            let base = cell.as_text().unwrap_or_else(|| "__EMPTY".to_string());
            let mut name = base.clone();
            if used.contains(&name) {
                let suffix = next_suffix.entry(base.clone()).or_insert(1);
                loop {
                    name = format!("{}_{}", base, suffix);
                    *suffix += 1;
                    if !used.contains(&name) {
                        break;
                    }
                }
            }
            used.insert(name.clone());
            name
        })
        .collect()
}

/// 按表头组装原始行；全空行返回 None
fn build_row(headers: &[String], cells: impl Iterator<Item = CellValue>) -> Option<RawRow> {
    let mut row = RawRow::new();
    for (col_idx, value) in cells.enumerate() {
        if !value.is_present() {
            continue;
        }
        if let Some(header) = headers.get(col_idx) {
            row.insert(header.clone(), value);
        }
    }

    if row.is_empty() {
        None
    } else {
        Some(row)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    /// 打开工作簿并读取第一个工作表
    fn first_sheet_range(&self, bytes: &[u8]) -> ImportResult<Range<Data>> {
        let cursor = Cursor::new(bytes);
        let mut workbook = open_workbook_auto_from_rs(cursor)?;

        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names.first().cloned().ok_or(ImportError::NoSheets)?;

        Ok(workbook.worksheet_range(&sheet_name)?)
    }

    /// 单元格 → CellValue
    ///
    /// 日期格式单元格保留其序列号（与表格工具导出的原始值一致）
    pub fn cell_value(cell: &Data) -> CellValue {
        match cell {
            Data::Empty => CellValue::Empty,
            Data::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(trimmed.to_string())
                }
            }
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
            Data::Error(_) => CellValue::Empty,
        }
    }
}

impl FileParser for ExcelParser {
    fn parse_to_raw_rows(&self, bytes: &[u8]) -> ImportResult<Vec<RawRow>> {
        let range = self.first_sheet_range(bytes)?;

        let mut rows = range.rows();
        let header_row = match rows.next() {
            Some(r) => r,
            None => return Ok(Vec::new()),
        };
        let header_cells: Vec<CellValue> = header_row.iter().map(Self::cell_value).collect();
        let headers = header_names(&header_cells);

        let records = rows
            .filter_map(|data_row| build_row(&headers, data_row.iter().map(Self::cell_value)))
            .collect();

        Ok(records)
    }

    fn read_header_cells(&self, bytes: &[u8]) -> ImportResult<Vec<CellValue>> {
        let range = self.first_sheet_range(bytes)?;
        Ok(range
            .rows()
            .next()
            .map(|r| r.iter().map(Self::cell_value).collect())
            .unwrap_or_default())
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
// 表头一律为文本；数据单元格为纯数字时读作数值（与 Excel 单元格一致）
pub struct CsvParser;

impl CsvParser {
    fn text_cell(raw: &str) -> CellValue {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }

    /// 数据单元格：纯数字 → Number，其余 → Text
    ///
    /// 前导零（如 "00123"）保留为文本，避免编号丢失
    pub fn data_cell(raw: &str) -> CellValue {
        let trimmed = raw.trim();
        match Self::plain_number(trimmed) {
            Some(n) => CellValue::Number(n),
            None => Self::text_cell(trimmed),
        }
    }

    fn plain_number(s: &str) -> Option<f64> {
        let digits = s.trim_start_matches(['-', '+']);
        if digits.is_empty()
            || !digits.starts_with(|c: char| c.is_ascii_digit() || c == '.')
            || !s
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        {
            return None;
        }
        let bytes = digits.as_bytes();
        if bytes.len() > 1 && bytes[0] == b'0' && bytes[1].is_ascii_digit() {
            return None;
        }
        s.parse::<f64>().ok().filter(|n| n.is_finite())
    }
}

impl FileParser for CsvParser {
    fn parse_to_raw_rows(&self, bytes: &[u8]) -> ImportResult<Vec<RawRow>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(bytes);

        let header_cells: Vec<CellValue> = reader.headers()?.iter().map(Self::text_cell).collect();
        let headers = header_names(&header_cells);

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            if let Some(row) = build_row(&headers, record.iter().map(Self::data_cell)) {
                records.push(row);
            }
        }

        Ok(records)
    }

    fn read_header_cells(&self, bytes: &[u8]) -> ImportResult<Vec<CellValue>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);
        Ok(reader.headers()?.iter().map(Self::text_cell).collect())
    }
}

// ==========================================
// 通用文件解析器（根据文件名选择）
// ==========================================
// .csv 走 CSV；其余一律交给 calamine 嗅探容器格式
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn for_file_name(file_name: &str) -> Box<dyn FileParser> {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Box::new(CsvParser),
            _ => Box::new(ExcelParser),
        }
    }

    pub fn parse(&self, file_name: &str, bytes: &[u8]) -> ImportResult<Vec<RawRow>> {
        Self::for_file_name(file_name).parse_to_raw_rows(bytes)
    }

    pub fn read_header_cells(&self, file_name: &str, bytes: &[u8]) -> ImportResult<Vec<CellValue>> {
        Self::for_file_name(file_name).read_header_cells(bytes)
    }
}
