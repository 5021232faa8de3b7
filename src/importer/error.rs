// ==========================================
// 销售分析看板 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分层: 调用方错误（可恢复，4xx）/ 意外故障（5xx）
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("No file provided")]
    MissingFile,

    /// 字节流不是可识别的表格容器
    #[error("Failed to parse Excel file: {0}")]
    ParseError(String),

    #[error("Failed to parse CSV file: {0}")]
    CsvParseError(String),

    /// 工作簿没有任何工作表
    #[error("Workbook contains no sheets")]
    NoSheets,

    /// 表头行为空（列检测阶段）
    #[error("Excel file is empty")]
    EmptyFile,

    /// 有表头但没有数据行（导入阶段）
    #[error("File is empty")]
    NoDataRows,

    // ===== 业务输入错误 =====
    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    #[error("Unknown destination column: {0}")]
    UnknownColumn(String),

    /// 汇率文件缺少 year / currency / rate 列
    #[error("Required columns not found. Expected: year, currency, rate (missing: {})", .missing.join(", "))]
    MissingRateColumns { missing: Vec<&'static str> },

    #[error("No valid exchange rate data found in file")]
    NoValidRates,

    // ===== 持久化错误 =====
    #[error("Failed to persist rows: {0}")]
    PersistError(String),
}

impl ImportError {
    /// 是否属于调用方错误（输入缺失/格式不符），而非服务端故障
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ImportError::MissingFile
                | ImportError::NoSheets
                | ImportError::EmptyFile
                | ImportError::NoDataRows
                | ImportError::InvalidEntity(_)
                | ImportError::UnknownColumn(_)
                | ImportError::MissingRateColumns { .. }
                | ImportError::NoValidRates
        )
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ParseError(err.to_string())
    }
}

// 实现 From<RepositoryError>
impl From<RepositoryError> for ImportError {
    fn from(err: RepositoryError) -> Self {
        ImportError::PersistError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
