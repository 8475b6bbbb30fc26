// 公开内部模块以便测试
pub mod app;
pub mod bot;
pub mod config;
pub mod error;
pub mod extraction;
pub mod ledger;
pub mod utils;

// 重新导出常用的类型和结构体
pub use bot::{DialogueController, InboundMessage, Messenger, Reply};
pub use config::Settings;
pub use error::FinanceBotError;
pub use extraction::{CompletionProvider, ExtractionClient, ImageData};
pub use ledger::{LedgerStore, SheetBackend, TransactionRecord};
