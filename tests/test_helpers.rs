// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的临时数据库、应用状态、xlsx 生成、multipart 请求体
// ==========================================

use rust_xlsxwriter::Workbook;
use sales_analytics::app::AppState;
use sales_analytics::config::AppConfig;
use std::error::Error;
use tempfile::NamedTempFile;

/// 创建临时测试数据库路径
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_string_lossy().to_string();
    Ok((temp_file, db_path))
}

/// 创建基于临时数据库的应用状态
pub fn create_test_state() -> Result<(NamedTempFile, AppState), Box<dyn Error>> {
    create_test_state_with(|_| {})
}

/// 创建应用状态，允许调整配置
pub fn create_test_state_with<F>(adjust: F) -> Result<(NamedTempFile, AppState), Box<dyn Error>>
where
    F: FnOnce(&mut AppConfig),
{
    let (temp_file, db_path) = create_test_db()?;
    let mut config = AppConfig::new(db_path);
    adjust(&mut config);
    let state = AppState::new(config)?;
    Ok((temp_file, state))
}

// ==========================================
// xlsx 生成
// ==========================================

/// 测试单元格
#[derive(Debug, Clone)]
pub enum XCell {
    Text(&'static str),
    Number(f64),
    Empty,
}

/// 生成单工作表 xlsx（第一行为表头）
pub fn build_xlsx(headers: &[&str], rows: &[Vec<XCell>]) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Sales")?;

    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header)?;
    }

    for (r, row) in rows.iter().enumerate() {
        let row_idx = (r + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            match cell {
                XCell::Text(text) => {
                    sheet.write_string(row_idx, col as u16, *text)?;
                }
                XCell::Number(n) => {
                    sheet.write_number(row_idx, col as u16, *n)?;
                }
                XCell::Empty => {}
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// 三行标准销售数据（其中一行没有业务主键）
///
/// Invoice date 使用 Excel 序列号：45306 = 2024-01-15, 45342 = 2024-02-20
pub fn sample_sales_xlsx() -> Result<Vec<u8>, Box<dyn Error>> {
    build_xlsx(
        &["Invoice date", "Invoice", "Item number", "Quantity", "Line Amount_MST", "Due date"],
        &[
            vec![
                XCell::Number(45306.0),
                XCell::Text("INV-001"),
                XCell::Text("ITEM-A"),
                XCell::Number(2.0),
                XCell::Number(1500.0),
                XCell::Text("2024-02-15"),
            ],
            vec![
                XCell::Number(45342.0),
                XCell::Text("INV-002"),
                XCell::Text("ITEM-B"),
                XCell::Number(1.0),
                XCell::Text("$2,500.25"),
                XCell::Empty,
            ],
            vec![
                XCell::Number(45342.0),
                XCell::Empty,
                XCell::Empty,
                XCell::Empty,
                XCell::Text("N/A"),
                XCell::Empty,
            ],
        ],
    )
}

// ==========================================
// multipart 请求体
// ==========================================

pub const BOUNDARY: &str = "sales-analytics-test-boundary";

/// multipart 表单字段
pub enum FormPart<'a> {
    File { file_name: &'a str, bytes: &'a [u8] },
    Text { name: &'a str, value: &'a str },
}

/// 组装 multipart/form-data 请求体（文件字段名为 file）
pub fn multipart_body(parts: &[FormPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            FormPart::File { file_name, bytes } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            FormPart::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
