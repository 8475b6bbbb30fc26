pub mod memory;
pub mod models;
pub mod report;
pub mod sheets;
pub mod sqlite;
pub mod store;

pub use memory::MemorySheet;
pub use models::{
    AppendOutcome, Item, LedgerRow, PaymentMethod, TransactionRecord, TransactionType,
    LEDGER_HEADER,
};
pub use report::{AggregateEntry, WeeklyReport};
pub use sheets::GoogleSheet;
pub use sqlite::SqliteSheet;
pub use store::{LedgerStore, SheetBackend};
