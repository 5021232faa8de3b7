// ==========================================
// 销售分析看板 - 列映射API
// ==========================================
// 职责: 按实体读取 / 保存 / 停用表头 → 标准字段映射
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::{CanonicalField, ColumnMappingEntry};
use crate::importer::{ColumnMapping, ImportError};
use crate::repository::ColumnMappingRepository;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// 列映射查询响应
#[derive(Debug, Clone, Serialize)]
pub struct ColumnMappingResponse {
    pub entity: String,
    /// { excel_column: db_column }
    pub mapping: HashMap<String, String>,
    /// 启用映射明细（按 excel_column 排序）
    pub mappings: Vec<ColumnMappingEntry>,
}

/// 列映射API
pub struct ColumnMappingApi {
    mapping_repo: Arc<ColumnMappingRepository>,
}

impl ColumnMappingApi {
    pub fn new(mapping_repo: Arc<ColumnMappingRepository>) -> Self {
        Self { mapping_repo }
    }

    /// 查询实体的启用映射
    pub fn get(&self, entity: &str) -> ApiResult<ColumnMappingResponse> {
        let entity = require_entity(entity)?;
        let mappings = self.mapping_repo.list_active(entity)?;
        let mapping = ColumnMapping::from_saved(&mappings).to_map();

        Ok(ColumnMappingResponse {
            entity: entity.to_string(),
            mapping,
            mappings,
        })
    }

    /// 保存映射（替换实体的全部启用映射）
    ///
    /// # 返回
    /// - Ok(count): 保存条数
    /// - Err(InvalidInput): 实体为空 / 目标列不在字段目录中
    pub fn save(&self, entity: &str, mappings: &HashMap<String, String>) -> ApiResult<usize> {
        let entity = require_entity(entity)?;

        let mut pairs: Vec<(String, CanonicalField)> = mappings
            .iter()
            .map(|(excel_column, db_column)| {
                CanonicalField::from_str(db_column)
                    .map(|field| (excel_column.clone(), field))
                    .map_err(|_| ApiError::from(ImportError::UnknownColumn(db_column.clone())))
            })
            .collect::<ApiResult<_>>()?;
        pairs.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(self.mapping_repo.replace_active(entity, &pairs)?)
    }

    /// 停用实体的全部映射
    pub fn delete(&self, entity: &str) -> ApiResult<usize> {
        let entity = require_entity(entity)?;
        let count = self.mapping_repo.deactivate_all(entity)?;
        info!(entity, count, "列映射已停用");
        Ok(count)
    }
}

fn require_entity(entity: &str) -> ApiResult<&str> {
    let trimmed = entity.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidInput("Entity is required".to_string()));
    }
    Ok(trimmed)
}
