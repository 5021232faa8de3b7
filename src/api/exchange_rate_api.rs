// ==========================================
// 销售分析看板 - 汇率API
// ==========================================
// 职责: 汇率文件上传（解析 + upsert）/ 汇率查询
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::{SkippedRateRow, StoredExchangeRate};
use crate::importer::ExchangeRateExtractor;
use crate::repository::ExchangeRateRepository;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// 汇率上传结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateUploadSummary {
    pub count: usize,
    pub skipped: Vec<SkippedRateRow>,
    /// 本次涉及年份的最新汇率
    pub rates: Vec<StoredExchangeRate>,
}

/// 汇率API
pub struct ExchangeRateApi {
    rate_repo: Arc<ExchangeRateRepository>,
    extractor: ExchangeRateExtractor,
}

impl ExchangeRateApi {
    pub fn new(rate_repo: Arc<ExchangeRateRepository>) -> Self {
        Self {
            rate_repo,
            extractor: ExchangeRateExtractor::new(),
        }
    }

    /// 上传汇率文件
    pub fn upload(&self, file_name: &str, bytes: &[u8]) -> ApiResult<RateUploadSummary> {
        let extraction = self.extractor.extract(file_name, bytes)?;
        let count = extraction.rates.len();
        self.rate_repo.upsert_all(&extraction.rates)?;

        let mut years: Vec<i32> = extraction.rates.iter().map(|r| r.year).collect();
        years.sort_unstable();
        years.dedup();

        let mut rates = Vec::new();
        for year in years.into_iter().rev() {
            rates.extend(self.rate_repo.list(Some(year))?);
        }

        info!(file_name, count, skipped = extraction.skipped.len(), "汇率上传完成");
        Ok(RateUploadSummary {
            count,
            skipped: extraction.skipped,
            rates,
        })
    }

    /// 汇率列表；year 为 None 时返回全部
    pub fn list(&self, year: Option<i32>) -> ApiResult<Vec<StoredExchangeRate>> {
        Ok(self.rate_repo.list(year)?)
    }
}
