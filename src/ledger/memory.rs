use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::LedgerError;
use crate::ledger::store::SheetBackend;

/// 内存中的表格，用于测试和本地调试
#[derive(Debug, Default)]
pub struct MemorySheet {
    rows: Mutex<Vec<Vec<String>>>,
    should_fail: AtomicBool,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: Mutex::new(rows),
            should_fail: AtomicBool::new(false),
        }
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> Vec<Vec<String>> {
        self.rows.lock().await.clone()
    }

    fn check(&self) -> Result<(), LedgerError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(LedgerError::backend("memory sheet is unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl SheetBackend for MemorySheet {
    async fn rows(&self) -> Result<Vec<Vec<String>>, LedgerError> {
        self.check()?;
        Ok(self.rows.lock().await.clone())
    }

    async fn append_row(&self, cells: Vec<String>) -> Result<(), LedgerError> {
        self.check()?;
        self.rows.lock().await.push(cells);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
