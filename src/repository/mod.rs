// ==========================================
// 销售分析看板 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod column_mapping_repo;
pub mod error;
pub mod exchange_rate_repo;
pub mod sales_repo;
pub mod upload_history_repo;

// 重导出核心仓储
pub use column_mapping_repo::ColumnMappingRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use exchange_rate_repo::ExchangeRateRepository;
pub use sales_repo::{SalesDataSink, SalesRepository};
pub use upload_history_repo::{UploadHistoryRepository, ALL_ENTITIES};
