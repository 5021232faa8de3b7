// ==========================================
// 销售分析看板 - 导入API
// ==========================================
// 职责: 封装列检测 / 上传校验 / 上传导入 / 上传历史
// 与 HTTP 框架无关，由 app::routes 调用
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::{UploadHistory, ValidationResult};
use crate::importer::{
    ColumnDetector, ColumnMapping, DetectedColumns, ImportOutcome, SalesImporter,
    SalesImporterImpl,
};
use crate::repository::{
    ColumnMappingRepository, SalesRepository, UploadHistoryRepository, ALL_ENTITIES,
};
use std::sync::Arc;
use tracing::{debug, info};

/// 导入API
pub struct ImportApi {
    importer: Arc<SalesImporterImpl<SalesRepository>>,
    mapping_repo: Arc<ColumnMappingRepository>,
    history_repo: Arc<UploadHistoryRepository>,
    detector: ColumnDetector,
    history_default_limit: usize,
}

impl ImportApi {
    pub fn new(
        importer: Arc<SalesImporterImpl<SalesRepository>>,
        mapping_repo: Arc<ColumnMappingRepository>,
        history_repo: Arc<UploadHistoryRepository>,
        history_default_limit: usize,
    ) -> Self {
        Self {
            importer,
            mapping_repo,
            history_repo,
            detector: ColumnDetector::new(),
            history_default_limit,
        }
    }

    /// 检测上传文件的表头
    ///
    /// # 返回
    /// - Ok(DetectedColumns): 文件表头 + 标准字段目录
    /// - Err(InvalidInput): 表头为空 / 格式不支持
    pub fn detect_columns(&self, file_name: &str, bytes: &[u8]) -> ApiResult<DetectedColumns> {
        Ok(self.detector.detect(file_name, bytes)?)
    }

    /// 只校验不落库
    ///
    /// 实体非法时不报错，而是作为第 0 行错误写入结果
    pub fn validate_upload(
        &self,
        file_name: &str,
        bytes: &[u8],
        entity: &str,
    ) -> ApiResult<ValidationResult> {
        let result = self.importer.validate_only(file_name, bytes, entity)?;
        debug!(valid = result.valid, errors = result.errors.len(), "上传校验完成");
        Ok(result)
    }

    /// 上传并导入
    ///
    /// 实体存在已保存映射时使用保存的映射，否则使用默认表头映射
    pub async fn upload(
        &self,
        entity: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> ApiResult<ImportOutcome> {
        let saved = self.mapping_repo.list_active(entity)?;
        let mapping = if saved.is_empty() {
            None
        } else {
            info!(entity, mappings = saved.len(), "使用已保存的列映射");
            Some(ColumnMapping::from_saved(&saved))
        };

        Ok(self.importer.import(file_name, bytes, entity, mapping).await?)
    }

    /// 上传历史（最新在前）
    ///
    /// # 参数
    /// - entity: None / "All" 表示全部实体
    /// - limit: None 或 0 时使用配置的默认条数
    pub fn list_history(
        &self,
        entity: Option<&str>,
        limit: Option<usize>,
    ) -> ApiResult<Vec<UploadHistory>> {
        let limit = match limit {
            Some(n) if n > 0 => n,
            _ => self.history_default_limit,
        };
        let entity = entity.filter(|e| !e.is_empty() && *e != ALL_ENTITIES);
        self.history_repo.list(entity, limit).map_err(ApiError::from)
    }
}
