// ==========================================
// 销售分析看板 - 应用层
// ==========================================
// 职责: 应用状态 + axum HTTP 服务
// ==========================================

pub mod routes;
pub mod state;

// 重导出
pub use routes::create_router;
pub use state::AppState;
