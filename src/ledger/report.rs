use std::collections::BTreeMap;

use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime};
use log::{debug, warn};

use crate::error::LedgerError;
use crate::ledger::models::LedgerRow;
use crate::utils::{parse_amount, Formatter, Timestamps};

pub const CSV_HEADER: [&str; 6] = ["date", "category", "payment_method", "type", "amount", "summary"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateEntry {
    pub date: NaiveDate,
    pub category: String,
    pub payment_method: String,
    pub kind: String,
    pub amount: i64,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyReport {
    pub entries: Vec<AggregateEntry>,
    /// 归档用/交给语言模型的 CSV
    pub csv: String,
    /// 给用户看的报告
    pub report: String,
}

impl WeeklyReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn row_amount(row: &LedgerRow) -> i64 {
    match parse_amount(&row.amount) {
        Some(amount) => amount,
        None => {
            warn!(
                "Unparsable ledger amount {:?} at {}, counting as 0",
                row.amount, row.timestamp
            );
            0
        }
    }
}

/// Aggregates the rows of the seven days before `now` (local time) by
/// `(date, category, payment_method, type)`. Rows whose timestamp does not
/// parse are left out.
pub fn weekly_aggregate(
    rows: &[LedgerRow],
    now: NaiveDateTime,
    offset: FixedOffset,
) -> Result<WeeklyReport, LedgerError> {
    let cutoff = now - Duration::days(7);

    let mut groups: BTreeMap<(NaiveDate, String, String, String), (i64, Vec<String>)> =
        BTreeMap::new();

    for row in rows {
        let Some(ts) = Timestamps::parse(&row.timestamp, offset) else {
            debug!("Skipping row with unparsable timestamp {:?}", row.timestamp);
            continue;
        };
        if ts < cutoff {
            continue;
        }

        let key = (
            ts.date(),
            row.category.clone(),
            row.payment_method.clone(),
            row.kind.clone(),
        );
        let entry = groups.entry(key).or_insert_with(|| (0, Vec::new()));
        let amount = row_amount(row);
        entry.0 = match entry.0.checked_add(amount) {
            Some(total) => total,
            None => {
                warn!(
                    "Ledger amount {:?} at {} overflows the group total, counting as 0",
                    row.amount, row.timestamp
                );
                entry.0
            }
        };
        if !row.summary.trim().is_empty() {
            entry.1.push(row.summary.clone());
        }
    }

    let entries = groups
        .into_iter()
        .map(|((date, category, payment_method, kind), (amount, summaries))| AggregateEntry {
            date,
            category,
            payment_method,
            kind,
            amount,
            summary: summaries.join(", "),
        })
        .collect::<Vec<_>>();

    let csv = to_csv(&entries)?;
    let report = to_report(&entries);

    Ok(WeeklyReport {
        entries,
        csv,
        report,
    })
}

fn to_csv(entries: &[AggregateEntry]) -> Result<String, LedgerError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for entry in entries {
        writer.write_record([
            entry.date.to_string(),
            entry.category.clone(),
            entry.payment_method.clone(),
            entry.kind.clone(),
            entry.amount.to_string(),
            entry.summary.clone(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| LedgerError::backend(format!("failed to flush CSV: {e}")))?;
    String::from_utf8(bytes).map_err(|e| LedgerError::backend(format!("CSV is not UTF-8: {e}")))
}

fn to_report(entries: &[AggregateEntry]) -> String {
    let mut sections = Vec::new();
    let mut current_date = None;

    for entry in entries {
        if current_date != Some(entry.date) {
            current_date = Some(entry.date);
            sections.push(format!("📅 *{}*", entry.date));
        }

        let method = if entry.payment_method.is_empty() {
            "-"
        } else {
            entry.payment_method.as_str()
        };
        sections.push(format!(
            "{} *{}* - {} ({})\n   {}",
            Formatter::category_icon(&entry.category),
            entry.category,
            Formatter::format_rupiah(entry.amount as f64),
            method,
            entry.summary
        ));
    }

    sections.join("\n\n")
}
