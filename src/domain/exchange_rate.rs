// ==========================================
// 销售分析看板 - 汇率领域模型
// ==========================================
// 对齐: exchange_rate 表（主键 year + currency）
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 可接受的汇率年份范围（含两端）
pub const RATE_YEAR_RANGE: std::ops::RangeInclusive<i32> = 2000..=2100;

/// 年度汇率：1 单位外币折合的本位币金额
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub year: i32,
    pub currency: String,
    pub rate: f64,
}

/// 已落库的汇率（带更新时间）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredExchangeRate {
    pub year: i32,
    pub currency: String,
    pub rate: f64,
    pub updated_at: DateTime<Utc>,
}

/// 被跳过的汇率行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRateRow {
    /// 表格行号（表头为第 1 行）
    pub row: usize,
    pub reason: String,
}

/// 汇率文件解析结果
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RateExtraction {
    pub rates: Vec<ExchangeRate>,
    pub skipped: Vec<SkippedRateRow>,
}
