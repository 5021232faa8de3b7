// ==========================================
// 销售分析看板 - API 层
// ==========================================
// 职责: 提供业务 API 接口，供 HTTP 路由调用
// ==========================================

pub mod column_mapping_api;
pub mod entity_api;
pub mod error;
pub mod exchange_rate_api;
pub mod import_api;

// 重导出核心类型
pub use column_mapping_api::{ColumnMappingApi, ColumnMappingResponse};
pub use entity_api::{EntityApi, EUROPE};
pub use error::{ApiError, ApiResult, ErrorBody};
pub use exchange_rate_api::{ExchangeRateApi, RateUploadSummary};
pub use import_api::ImportApi;
