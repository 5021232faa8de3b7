// ==========================================
// 销售分析看板 - 汇率文件提取
// ==========================================
// 输入: 第一个工作表（或 CSV），需含 year / currency / rate 三列
// 列识别: 只看第一个数据行的键，忽略大小写，别名按优先级
// 行规则: 非法行跳过并记录原因，不中止；全部非法时报错
// ==========================================

use crate::domain::{
    CellValue, ExchangeRate, RateExtraction, RawRow, SkippedRateRow, RATE_YEAR_RANGE,
};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::type_coercer::TypeCoercer;
use tracing::{debug, info, warn};

const YEAR_ALIASES: &[&str] = &["year"];
const CURRENCY_ALIASES: &[&str] = &["currency", "curr", "cur"];
const RATE_ALIASES: &[&str] = &["rate", "exchange_rate", "exchange rate"];

/// 识别出的汇率列（原始表头名）
#[derive(Debug, Clone, PartialEq, Eq)]
struct RateColumns {
    year: String,
    currency: String,
    rate: String,
}

pub struct ExchangeRateExtractor {
    file_parser: UniversalFileParser,
    coercer: TypeCoercer,
}

impl Default for ExchangeRateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ExchangeRateExtractor {
    pub fn new() -> Self {
        Self {
            file_parser: UniversalFileParser,
            coercer: TypeCoercer,
        }
    }

    /// 解析汇率文件
    ///
    /// # 返回
    /// - Ok(RateExtraction): 合法汇率 + 被跳过的行
    /// - Err(EmptyFile): 没有数据行
    /// - Err(MissingRateColumns): 首行缺少必需列
    /// - Err(NoValidRates): 所有行都不合法
    pub fn extract(&self, file_name: &str, bytes: &[u8]) -> ImportResult<RateExtraction> {
        let rows = self.file_parser.parse(file_name, bytes)?;
        let first = rows.first().ok_or(ImportError::EmptyFile)?;
        let columns = detect_columns(first)?;
        debug!(?columns, rows = rows.len(), "汇率列识别完成");

        let mut extraction = RateExtraction::default();
        for (idx, row) in rows.iter().enumerate() {
            let row_number = idx + 2;
            match self.rate_from_row(row, &columns) {
                Ok(rate) => extraction.rates.push(rate),
                Err(reason) => {
                    warn!(row = row_number, reason = %reason, "汇率行跳过");
                    extraction.skipped.push(SkippedRateRow {
                        row: row_number,
                        reason,
                    });
                }
            }
        }

        if extraction.rates.is_empty() {
            return Err(ImportError::NoValidRates);
        }
        info!(
            valid = extraction.rates.len(),
            skipped = extraction.skipped.len(),
            "汇率文件解析完成"
        );
        Ok(extraction)
    }

    fn rate_from_row(&self, row: &RawRow, columns: &RateColumns) -> Result<ExchangeRate, String> {
        let cell = |name: &str| row.get(name).cloned().unwrap_or(CellValue::Empty);

        let year_cell = cell(&columns.year);
        let year = self.coercer.parse_number(&year_cell);
        let year = (year.is_finite() && RATE_YEAR_RANGE.contains(&(year.trunc() as i32)))
            .then(|| year.trunc() as i32)
            .ok_or_else(|| format!("Invalid year {}", year_cell))?;

        let currency = cell(&columns.currency)
            .as_text()
            .ok_or_else(|| "Currency is required".to_string())?;

        let rate = self.coercer.parse_number(&cell(&columns.rate));
        if !(rate.is_finite() && rate > 0.0) {
            return Err(format!("Invalid rate for {}", currency));
        }

        Ok(ExchangeRate {
            year,
            currency,
            rate,
        })
    }
}

/// 按别名优先级找出首个大小写无关匹配的键
fn find_column(row: &RawRow, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| {
        let mut matches: Vec<&String> = row
            .keys()
            .filter(|key| key.to_lowercase() == alias.to_lowercase())
            .collect();
        matches.sort();
        matches.first().map(|key| (*key).clone())
    })
}

fn detect_columns(first_row: &RawRow) -> ImportResult<RateColumns> {
    let year = find_column(first_row, YEAR_ALIASES);
    let currency = find_column(first_row, CURRENCY_ALIASES);
    let rate = find_column(first_row, RATE_ALIASES);

    match (year, currency, rate) {
        (Some(year), Some(currency), Some(rate)) => Ok(RateColumns {
            year,
            currency,
            rate,
        }),
        (year, currency, rate) => {
            let missing = [
                ("year", year.is_none()),
                ("currency", currency.is_none()),
                ("rate", rate.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            Err(ImportError::MissingRateColumns { missing })
        }
    }
}
