// ==========================================
// 销售分析看板 - 配置层
// ==========================================
// 职责: 显式配置对象（数据库路径 / 监听地址 / 上传上限）
// 校验/类型转换核心不读取配置
// ==========================================

pub mod app_config;

pub use app_config::{default_db_path, AppConfig, ConfigError, ConfigResult};
