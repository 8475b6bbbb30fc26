pub mod settings;

pub use settings::{AiProvider, LedgerBackendKind, Settings};
