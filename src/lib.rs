// ==========================================
// 销售分析看板 - 核心库
// ==========================================
// 技术栈: axum + Rust + SQLite
// 系统定位: 销售明细 Excel 导入与校验服务
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 导入层 - 表格读取 / 校验 / 类型转换
pub mod importer;

// 数据仓储层 - 数据访问
pub mod repository;

// 配置层 - 显式配置对象
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/表结构）
pub mod db;

// 日志系统
pub mod logging;

// 性能埋点（SQL 计数 / 慢 SQL）
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 应用层 - HTTP 服务
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    CanonicalField, CellValue, Entity, ImportSummary, Quarter, RawRow, SalesRecord,
    ValidationError, ValidationResult,
};

// 导入组件
pub use importer::{ColumnDetector, RowValidator, TypeCoercer};

// API
pub use api::{ApiError, ApiResult};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "销售分析看板";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
