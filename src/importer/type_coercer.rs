// ==========================================
// 销售分析看板 - 类型转换器
// ==========================================
// 职责: 原始单元格 → 标准类型
// - 日期: Excel 序列号 / 日期字符串 → NaiveDateTime
// - 数值: 货币格式字符串 → f64（无数字时为 NaN）
// - 派生: invoice_date → year / quarter / month
// ==========================================
// 说明: Excel 序列号以 1899-12-30 为纪元（serial 0）。
// 这会复现表格工具沿用的“1900 年是闰年”问题：1900-03-01 之前的序列号
// 与表格工具显示的日期相差一天。导出文件就是按此约定生成的，这里保持一致。
// ==========================================

use crate::domain::{CellValue, Quarter};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta};

/// 一天的毫秒数
const MS_PER_DAY: f64 = 86_400_000.0;

/// 可表示时间的最大毫秒偏移（超出即视为无效日期）
const MAX_TIME_MS: f64 = 8.64e15;

/// 带时间部分的日期格式
const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M",
];

/// 纯日期格式
const DATE_FORMATS: [&str; 11] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%a %b %d %Y",
];

pub struct TypeCoercer;

impl TypeCoercer {
    /// Excel 纪元: 1899-12-30 00:00:00
    fn excel_epoch() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(1899, 12, 30)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default()
    }

    /// Excel 序列号 → 日期时间
    ///
    /// 结果 = 纪元 + serial × 86,400,000 ms（毫秒截断取整）
    /// 非有限值或溢出返回 None
    pub fn excel_serial_to_datetime(&self, serial: f64) -> Option<NaiveDateTime> {
        if !serial.is_finite() {
            return None;
        }
        let offset_ms = (serial * MS_PER_DAY).trunc();
        if offset_ms.abs() > MAX_TIME_MS {
            return None;
        }
        let delta = TimeDelta::try_milliseconds(offset_ms as i64)?;
        Self::excel_epoch().checked_add_signed(delta)
    }

    /// 日期字符串 → 日期时间（按常见格式依次尝试）
    pub fn parse_date_string(&self, value: &str) -> Option<NaiveDateTime> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Some(dt.naive_utc());
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
            return Some(dt.naive_utc());
        }

        for fmt in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
                return Some(dt);
            }
        }

        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    /// 单元格 → 日期时间
    ///
    /// # 返回
    /// - Some: 解析成功
    /// - None: 解析失败（由校验器转换为 ValidationError，不抛错）
    pub fn coerce_date(&self, value: &CellValue) -> Option<NaiveDateTime> {
        match value {
            CellValue::Number(serial) => self.excel_serial_to_datetime(*serial),
            CellValue::Text(s) => self.parse_date_string(s),
            CellValue::Empty => None,
        }
    }

    /// 单元格 → ISO 日期（丢弃时间部分）
    pub fn coerce_iso_date(&self, value: &CellValue) -> Option<NaiveDate> {
        self.coerce_date(value).map(|dt| dt.date())
    }

    /// 单元格 → 数值
    ///
    /// 文本先去掉数字、小数点、负号以外的全部字符，再取最长合法数值前缀；
    /// 没有任何数字时返回 NaN（调用方决定按 0 计还是报错）
    pub fn parse_number(&self, value: &CellValue) -> f64 {
        match value {
            CellValue::Number(n) => *n,
            CellValue::Text(s) => {
                let cleaned: String = s
                    .chars()
                    .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                    .collect();
                parse_float_prefix(&cleaned)
            }
            CellValue::Empty => f64::NAN,
        }
    }

    /// 由日期派生 (年, 季度, 月)
    pub fn derive_period(&self, date: NaiveDate) -> (i32, Quarter, u32) {
        let month = date.month();
        let quarter = Quarter::from_month(month).unwrap_or(Quarter::Q1);
        (date.year(), quarter, month)
    }
}

/// 汇总口径：NaN 按 0 计
pub fn amount_or_zero(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

/// 容错求和（脏数据不阻断汇总）
pub fn sum_tolerant<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    values.into_iter().map(amount_or_zero).sum()
}

/// 取最长合法数值前缀: [-]digits[.digits]
fn parse_float_prefix(s: &str) -> f64 {
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut i = 0;

    if i < len && bytes[i] == b'-' {
        i += 1;
    }

    let int_start = i;
    while i < len && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;

    let mut frac_digits = 0;
    if i < len && bytes[i] == b'.' {
        let mut j = i + 1;
        while j < len && bytes[j].is_ascii_digit() {
            j += 1;
        }
        frac_digits = j - (i + 1);
        if int_digits > 0 || frac_digits > 0 {
            i = j;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return f64::NAN;
    }

    s[..i].parse::<f64>().unwrap_or(f64::NAN)
}
