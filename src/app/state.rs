// ==========================================
// 销售分析看板 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{ColumnMappingApi, EntityApi, ExchangeRateApi, ImportApi};
use crate::config::AppConfig;
use crate::db::{init_schema, open_sqlite_connection};
use crate::importer::SalesImporterImpl;
use crate::perf::install_sqlite_tracing;
use crate::repository::{
    ColumnMappingRepository, ExchangeRateRepository, SalesRepository, UploadHistoryRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源，作为 axum Router 的状态
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Arc<AppConfig>,

    /// 导入API（列检测 / 校验 / 上传 / 历史）
    pub import_api: Arc<ImportApi>,

    /// 列映射API
    pub column_mapping_api: Arc<ColumnMappingApi>,

    /// 实体API
    pub entity_api: Arc<EntityApi<SalesRepository>>,

    /// 汇率API
    pub exchange_rate_api: Arc<ExchangeRateApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 校验配置
    /// 2. 打开数据库并初始化表结构
    /// 3. 初始化所有Repository
    /// 4. 创建所有API实例
    pub fn new(config: AppConfig) -> Result<Self, String> {
        config
            .validate()
            .map_err(|e| format!("配置无效: {}", e))?;
        tracing::info!("初始化AppState，数据库路径: {}", config.database_path);

        // 创建数据库连接（共享连接）
        let mut conn = open_sqlite_connection(&config.database_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库表结构初始化失败: {}", e))?;
        install_sqlite_tracing(&mut conn);
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let sales_repo = Arc::new(SalesRepository::new(conn.clone()));
        let history_repo = Arc::new(UploadHistoryRepository::new(conn.clone()));
        let mapping_repo = Arc::new(ColumnMappingRepository::new(conn.clone()));
        let rate_repo = Arc::new(ExchangeRateRepository::new(conn));

        // ==========================================
        // 初始化API层
        // ==========================================
        let importer = Arc::new(SalesImporterImpl::new(
            sales_repo.clone(),
            history_repo.clone(),
        ));
        let import_api = Arc::new(ImportApi::new(
            importer,
            mapping_repo.clone(),
            history_repo,
            config.history_default_limit,
        ));
        let column_mapping_api = Arc::new(ColumnMappingApi::new(mapping_repo));
        let entity_api = Arc::new(EntityApi::new(sales_repo));
        let exchange_rate_api = Arc::new(ExchangeRateApi::new(rate_repo));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            config: Arc::new(config),
            import_api,
            column_mapping_api,
            entity_api,
            exchange_rate_api,
        })
    }
}
