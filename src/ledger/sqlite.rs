use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use rusqlite::{params, Connection};
use tokio::sync::Mutex;

use crate::error::LedgerError;
use crate::ledger::store::SheetBackend;

/// SQLite 中模拟的表格：每一行对应表格的一行，单元格以 JSON 数组保存
#[derive(Clone)]
pub struct SqliteSheet {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSheet {
    pub async fn new(path: &str) -> Result<Self, LedgerError> {
        let conn = Connection::open(path)?;
        let sheet = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        sheet.init_schema().await?;
        Ok(sheet)
    }

    async fn init_schema(&self) -> Result<(), LedgerError> {
        let conn = self.conn.lock().await;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS sheet_rows (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                cells TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        info!("Ledger schema initialized successfully");
        Ok(())
    }
}

#[async_trait]
impl SheetBackend for SqliteSheet {
    async fn rows(&self) -> Result<Vec<Vec<String>>, LedgerError> {
        let conn = self.conn.lock().await;

        let mut stmt = conn.prepare("SELECT cells FROM sheet_rows ORDER BY id")?;
        let encoded = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = Vec::with_capacity(encoded.len());
        for cells in encoded {
            rows.push(serde_json::from_str::<Vec<String>>(&cells)?);
        }
        Ok(rows)
    }

    async fn append_row(&self, cells: Vec<String>) -> Result<(), LedgerError> {
        let encoded = serde_json::to_string(&cells)?;
        let conn = self.conn.lock().await;

        conn.execute(
            "INSERT INTO sheet_rows (cells) VALUES (?1)",
            params![encoded],
        )?;

        debug!("Appended ledger row #{}", conn.last_insert_rowid());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
