// ==========================================
// 销售分析看板 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换导入/仓储错误
// 分层: 调用方错误（4xx）/ 意外故障（5xx）
// 状态码以数字给出，由应用层转换为 HTTP 响应
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use serde::Serialize;
use thiserror::Error;

/// API层错误类型
///
/// Display 文本即响应体中的 error / details，统一使用英文
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 调用方错误
    // ==========================================
    #[error("{0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File size exceeds {limit_mb}MB limit")]
    PayloadTooLarge { limit_mb: usize },

    // ==========================================
    // 导入错误
    // ==========================================
    /// 导入管道的意外故障（容器无法识别 / 落库失败）
    #[error("{0}")]
    ImportFailed(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApiError {
    /// HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidInput(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::PayloadTooLarge { .. } => 413,
            _ => 500,
        }
    }

    pub fn is_caller_error(&self) -> bool {
        self.status_code() < 500
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        if err.is_caller_error() {
            ApiError::InvalidInput(err.to_string())
        } else {
            ApiError::ImportFailed(err.to_string())
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} with id={}", entity, id))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

// ==========================================
// 错误响应体
// ==========================================

/// `{ success: false, error, details }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub details: String,
}

impl ErrorBody {
    /// 以操作名作为概要，错误消息作为详情
    pub fn new(operation: &str, err: &ApiError) -> Self {
        let error = if err.is_caller_error() {
            err.to_string()
        } else {
            operation.to_string()
        };
        Self {
            success: false,
            error,
            details: err.to_string(),
        }
    }
}
