// ==========================================
// 销售分析看板 - 领域类型定义
// ==========================================
// 职责: 法人实体（闭集）/ 单元格值 / 季度
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 法人实体 (Entity)
// ==========================================
// 闭集: 由调用方传入，不从文件内容推断
// 序列化格式: 与数据库 entity 列一致（原样大小写）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Entity {
    #[serde(rename = "HQ")]
    Hq,
    #[serde(rename = "USA")]
    Usa,
    #[serde(rename = "BWA")]
    Bwa,
    Vietnam,
    Healthcare,
    Korot,
    Japan,
    China,
    India,
    Mexico,
    Oceania,
    Netherlands,
    Germany,
    #[serde(rename = "UK")]
    Uk,
    Singapore,
}

impl Entity {
    /// 全部可上传实体（顺序即展示顺序）
    pub const ALL: [Entity; 15] = [
        Entity::Hq,
        Entity::Usa,
        Entity::Bwa,
        Entity::Vietnam,
        Entity::Healthcare,
        Entity::Korot,
        Entity::Japan,
        Entity::China,
        Entity::India,
        Entity::Mexico,
        Entity::Oceania,
        Entity::Netherlands,
        Entity::Germany,
        Entity::Uk,
        Entity::Singapore,
    ];

    /// 欧洲汇总视图的来源实体
    pub const EUROPE_SOURCES: [Entity; 3] = [Entity::Netherlands, Entity::Germany, Entity::Uk];

    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Hq => "HQ",
            Entity::Usa => "USA",
            Entity::Bwa => "BWA",
            Entity::Vietnam => "Vietnam",
            Entity::Healthcare => "Healthcare",
            Entity::Korot => "Korot",
            Entity::Japan => "Japan",
            Entity::China => "China",
            Entity::India => "India",
            Entity::Mexico => "Mexico",
            Entity::Oceania => "Oceania",
            Entity::Netherlands => "Netherlands",
            Entity::Germany => "Germany",
            Entity::Uk => "UK",
            Entity::Singapore => "Singapore",
        }
    }

    /// 逗号分隔的合法值列表（用于错误提示）
    pub fn allowed_list() -> String {
        Entity::ALL
            .iter()
            .map(|e| e.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 未知实体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEntity(pub String);

impl fmt::Display for UnknownEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid entity: {}. Must be one of: {}",
            self.0,
            Entity::allowed_list()
        )
    }
}

impl std::error::Error for UnknownEntity {}

impl FromStr for Entity {
    type Err = UnknownEntity;

    // 大小写敏感，与上游下拉框取值保持一致
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Entity::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| UnknownEntity(s.to_string()))
    }
}

// ==========================================
// 单元格值 (CellValue)
// ==========================================
// 原始行中的单元格只有三种形态: 文本 / 数值 / 空
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty,
}

impl CellValue {
    /// 是否视为“有值”（空单元格与空白文本都不算）
    pub fn is_present(&self) -> bool {
        match self {
            CellValue::Text(s) => !s.trim().is_empty(),
            CellValue::Number(n) => !n.is_nan(),
            CellValue::Empty => false,
        }
    }

    /// 文本形式（数值按最短表示输出，空为 None）
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Empty => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Empty => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

// ==========================================
// 季度 (Quarter)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    /// 由月份 (1-12) 计算季度
    pub fn from_month(month: u32) -> Option<Quarter> {
        match month {
            1..=3 => Some(Quarter::Q1),
            4..=6 => Some(Quarter::Q2),
            7..=9 => Some(Quarter::Q3),
            10..=12 => Some(Quarter::Q4),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quarter::Q1 => "Q1",
            Quarter::Q2 => "Q2",
            Quarter::Q3 => "Q3",
            Quarter::Q4 => "Q4",
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
