use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use log::{debug, info, warn};
use tokio::sync::Mutex;

use crate::error::LedgerError;
use crate::ledger::models::{
    header_cells, is_header, AppendOutcome, LedgerRow, TransactionRecord,
};
use crate::ledger::report::{self, WeeklyReport};
use crate::utils::Logger;

/// 类似电子表格的底层存储：按行读取、在末尾追加
#[async_trait]
pub trait SheetBackend: Send + Sync {
    /// All rows in sheet order, header row included when present.
    async fn rows(&self) -> Result<Vec<Vec<String>>, LedgerError>;

    async fn append_row(&self, cells: Vec<String>) -> Result<(), LedgerError>;

    fn name(&self) -> &'static str;
}

pub struct LedgerStore {
    backend: Arc<dyn SheetBackend>,
    write_lock: Mutex<()>,
    offset: FixedOffset,
}

impl LedgerStore {
    pub fn new(backend: Arc<dyn SheetBackend>, offset: FixedOffset) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
            offset,
        }
    }

    /// Appends one transaction unless a row with the same `(timestamp, raw_text)`
    /// already exists. The existence check and the append run under one lock.
    pub async fn append(
        &self,
        record: &TransactionRecord,
        raw_text: &str,
    ) -> Result<AppendOutcome, LedgerError> {
        let _guard = self.write_lock.lock().await;

        let rows = self.backend.rows().await?;

        let is_duplicate = rows.iter().any(|row| {
            row.first().map(String::as_str) == Some(record.timestamp.as_str())
                && row.get(1).map(String::as_str) == Some(raw_text)
        });
        if is_duplicate {
            Logger::log_duplicate_skipped(&record.timestamp, raw_text);
            return Ok(AppendOutcome::Duplicate);
        }

        match rows.first() {
            None => {
                info!("🔄 Ledger has no header, writing one");
                self.backend.append_row(header_cells()).await?;
            }
            // 只能在末尾追加，表头无法补到第一行
            Some(first) if first.iter().all(|c| c.trim().is_empty()) => {
                warn!("Ledger first row is empty, appending without a header");
            }
            Some(first) if !is_header(first) => {
                warn!("Ledger first row is not a header: {:?}", first);
            }
            _ => {}
        }

        let row = LedgerRow::from_record(record, raw_text);
        self.backend.append_row(row.to_cells()).await?;

        Logger::log_transaction_recorded(
            &record.timestamp,
            &record.category,
            record.amount,
            record.payment_method.as_str(),
        );
        Ok(AppendOutcome::Appended)
    }

    pub async fn read_all(&self) -> Result<Vec<LedgerRow>, LedgerError> {
        let rows = self.backend.rows().await?;
        let data = rows
            .iter()
            .filter(|cells| !cells.iter().all(|c| c.trim().is_empty()))
            .filter(|cells| !is_header(cells))
            .map(|cells| LedgerRow::from_cells(cells))
            .collect::<Vec<_>>();

        debug!("Read {} ledger rows from {}", data.len(), self.backend.name());
        Ok(data)
    }

    /// 最近的交易，最新的在前
    pub async fn recent(&self, limit: usize) -> Result<Vec<LedgerRow>, LedgerError> {
        let rows = self.read_all().await?;
        Ok(rows.into_iter().rev().take(limit).collect())
    }

    pub async fn weekly_aggregate(
        &self,
        now: DateTime<FixedOffset>,
    ) -> Result<WeeklyReport, LedgerError> {
        let rows = self.read_all().await?;
        let now = now.with_timezone(&self.offset).naive_local();
        report::weekly_aggregate(&rows, now, self.offset)
    }
}
