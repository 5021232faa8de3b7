// ==========================================
// 销售分析看板 - 应用配置
// ==========================================
// 职责: 显式构造的配置对象，由入口传入 AppState
// 必填: database_path（非空）
// 来源: 环境变量 > 默认值
// ==========================================

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

// ===== 环境变量 =====
pub const ENV_DB_PATH: &str = "SALES_ANALYTICS_DB_PATH";
pub const ENV_BIND_ADDR: &str = "SALES_ANALYTICS_BIND_ADDR";
pub const ENV_MAX_UPLOAD_MB: &str = "SALES_ANALYTICS_MAX_UPLOAD_MB";
pub const ENV_HISTORY_LIMIT: &str = "SALES_ANALYTICS_HISTORY_LIMIT";

// ===== 默认值 =====
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

const DB_FILE_NAME: &str = "sales_analytics.db";

/// 配置错误
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("缺少必填配置: {0}")]
    MissingField(&'static str),

    #[error("配置值无效 ({key}={value}): {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite 数据库文件
    pub database_path: String,
    /// HTTP 监听地址
    pub bind_addr: String,
    /// 请求体大小上限（字节）
    pub max_upload_bytes: usize,
    /// 上传历史默认条数
    pub history_default_limit: usize,
}

impl AppConfig {
    /// 以指定数据库路径构造，其余取默认值
    pub fn new(database_path: impl Into<String>) -> Self {
        Self {
            database_path: database_path.into(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            history_default_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// 从环境变量加载并校验
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载（便于测试）
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let database_path = non_empty(ENV_DB_PATH).unwrap_or_else(default_db_path);
        let mut config = Self::new(database_path);

        if let Some(addr) = non_empty(ENV_BIND_ADDR) {
            config.bind_addr = addr;
        }

        if let Some(raw) = non_empty(ENV_MAX_UPLOAD_MB) {
            let mb = parse_positive(ENV_MAX_UPLOAD_MB, &raw)?;
            config.max_upload_bytes = mb.saturating_mul(1024 * 1024);
        }

        if let Some(raw) = non_empty(ENV_HISTORY_LIMIT) {
            config.history_default_limit = parse_positive(ENV_HISTORY_LIMIT, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// 必填与取值范围校验
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::MissingField("database_path"));
        }

        if self.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::InvalidValue {
                key: "bind_addr",
                value: self.bind_addr.clone(),
                reason: "不是合法的 host:port".to_string(),
            });
        }

        if self.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_upload_bytes",
                value: "0".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }

        if self.history_default_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "history_default_limit",
                value: "0".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }

        Ok(())
    }
}

fn parse_positive(key: &'static str, raw: &str) -> ConfigResult<usize> {
    match raw.parse::<usize>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
            reason: "必须是正整数".to_string(),
        }),
    }
}

/// 默认数据库路径：用户数据目录，取不到时回退到当前目录
pub fn default_db_path() -> String {
    let mut path = PathBuf::from(format!("./{}", DB_FILE_NAME));

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        let dir = data_dir.join("sales-analytics-dev");

        #[cfg(not(debug_assertions))]
        let dir = data_dir.join("sales-analytics");

        // 目录创建失败时仍回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join(DB_FILE_NAME);
        }
    }

    path.to_string_lossy().to_string()
}
