use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};
use log::{error, info};
use regex::Regex;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 日志记录工具
pub struct Logger;

impl Logger {
    pub fn log_operation_start(operation: &str, details: &str) {
        info!("🚀 Starting {}: {}", operation, details);
    }

    pub fn log_operation_success(operation: &str, details: &str) {
        info!("✅ {} completed successfully: {}", operation, details);
    }

    pub fn log_operation_failure(operation: &str, error: &str) {
        error!("❌ {} failed: {}", operation, error);
    }

    pub fn log_transaction_recorded(
        timestamp: &str,
        category: &str,
        amount: f64,
        payment_method: &str,
    ) {
        info!(
            "💰 Transaction recorded: {} | {} {} | {}",
            timestamp,
            category,
            Formatter::format_rupiah(amount),
            payment_method
        );
    }

    pub fn log_duplicate_skipped(timestamp: &str, raw_text: &str) {
        info!(
            "🔁 Duplicate delivery skipped: {} | {}",
            timestamp, raw_text
        );
    }
}

/// 格式化工具
pub struct Formatter;

impl Formatter {
    /// 15000.0 -> "Rp15,000"
    pub fn format_rupiah(amount: f64) -> String {
        let rounded = amount.round() as i64;
        let digits = rounded.unsigned_abs().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        if rounded < 0 {
            format!("-Rp{grouped}")
        } else {
            format!("Rp{grouped}")
        }
    }

    /// 写入账本的金额单元格，整数不带小数点
    pub fn format_amount_cell(amount: f64) -> String {
        if amount.is_finite() && amount.fract() == 0.0 {
            format!("{:.0}", amount)
        } else {
            amount.to_string()
        }
    }

    pub fn category_icon(category: &str) -> &'static str {
        let category = category.to_lowercase();
        if category.contains("grocery") || category.contains("shopping") {
            "🛒"
        } else if category.contains("food") {
            "🍽️"
        } else if category.contains("transfer") {
            "💰"
        } else {
            "💳"
        }
    }
}

fn currency_regex() -> &'static Regex {
    static INSTANCE: OnceLock<Regex> = OnceLock::new();
    INSTANCE.get_or_init(|| Regex::new(r"(?i)(rp\.?|idr|usd|\$|€|£|\s)").unwrap())
}

/// Parses a ledger amount cell. Currency symbols and thousands separators are
/// stripped; a trailing group of other than three digits is a decimal part and
/// is dropped. Returns `None` when what remains is not an integer.
pub fn parse_amount(raw: &str) -> Option<i64> {
    let cleaned = currency_regex().replace_all(raw.trim(), "");
    if cleaned.is_empty() {
        return None;
    }

    let (negative, body) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_ref()),
    };

    let integer_part = match body.rfind(['.', ',']) {
        Some(pos) if body.len() - pos - 1 != 3 => &body[..pos],
        _ => body,
    };

    let digits: String = integer_part
        .chars()
        .filter(|c| !matches!(c, '.' | ',' | '_' | '\''))
        .collect();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let value = digits.parse::<i64>().ok()?;
    Some(if negative { -value } else { value })
}

/// 时间戳工具，账本统一使用固定时区
pub struct Timestamps;

impl Timestamps {
    pub fn offset(hours: i32) -> FixedOffset {
        FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
    }

    pub fn now(offset: FixedOffset) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&offset)
    }

    pub fn format_unix(unix_seconds: i64, offset: FixedOffset) -> String {
        DateTime::<Utc>::from_timestamp(unix_seconds, 0)
            .unwrap_or_default()
            .with_timezone(&offset)
            .format(TIMESTAMP_FORMAT)
            .to_string()
    }

    /// Parses a stored timestamp into local wall-clock time. Offset-carrying
    /// values are converted into `offset` first.
    pub fn parse(value: &str, offset: FixedOffset) -> Option<NaiveDateTime> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.with_timezone(&offset).naive_local());
        }

        const FORMATS: [&str; 4] = [
            TIMESTAMP_FORMAT,
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M",
            "%Y-%m-%dT%H:%M",
        ];
        for format in FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
                return Some(dt);
            }
        }

        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }
}
