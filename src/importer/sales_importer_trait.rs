// ==========================================
// 销售分析看板 - 销售导入 Trait
// ==========================================
// 职责: 定义导入管道接口（不包含实现）
// ==========================================

use crate::domain::{Entity, ImportSummary, RawRow, SalesRecord, ValidationResult};
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::ColumnMapping;
use async_trait::async_trait;
use serde::Serialize;

/// 导入结果：成功落库 / 校验未通过（不落库）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ImportOutcome {
    Imported(ImportSummary),
    Rejected(ValidationResult),
}

impl ImportOutcome {
    pub fn is_imported(&self) -> bool {
        matches!(self, ImportOutcome::Imported(_))
    }
}

// ==========================================
// SalesImporter Trait
// ==========================================
// 用途: 销售数据导入主接口
// 实现者: SalesImporterImpl
#[async_trait]
pub trait SalesImporter: Send + Sync {
    /// 导入上传文件
    ///
    /// # 参数
    /// - file_name: 原始文件名（决定 CSV / Excel 解析）
    /// - bytes: 文件内容（已完整读入内存）
    /// - entity: 调用方指定的实体
    /// - mapping: 列映射；None 时使用默认表头映射
    ///
    /// # 返回
    /// - Ok(Imported): 已落库，附汇总
    /// - Ok(Rejected): 校验未通过，附完整错误列表
    /// - Err: 调用方错误（实体非法 / 空文件）或意外故障
    ///
    /// # 导入流程
    /// 1. 实体校验 + 上传历史（processing）
    /// 2. 文件解析
    /// 3. 行校验
    /// 4. 字段映射与类型转换
    /// 5. 剔除无主键行
    /// 6. 落库 + 上传历史（success / failed）
    async fn import(
        &self,
        file_name: &str,
        bytes: &[u8],
        entity: &str,
        mapping: Option<ColumnMapping>,
    ) -> ImportResult<ImportOutcome>;

    /// 只解析并校验，不落库
    fn validate_only(&self, file_name: &str, bytes: &[u8], entity: &str)
        -> ImportResult<ValidationResult>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 原始行 → 标准化销售记录
// 实现者: SalesFieldMapper
pub trait FieldMapper: Send + Sync {
    /// 映射单行
    ///
    /// # 参数
    /// - row_number: 表格行号（表头为第 1 行）
    fn map_row(
        &self,
        row: &RawRow,
        mapping: &ColumnMapping,
        entity: Entity,
        row_number: usize,
    ) -> SalesRecord;
}
