use teloxide::RequestError;
use thiserror::Error;

/// 语言模型抽取阶段的错误
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("No text or image was provided")]
    EmptyInput,

    #[error("Language model request failed: {message}")]
    Provider { message: String },

    #[error("Language model returned an unusable response: {message}")]
    MalformedResponse { message: String, raw: String },
}

impl ExtractionError {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
            raw: raw.into(),
        }
    }
}

impl From<reqwest::Error> for ExtractionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::provider(format!("request timed out: {err}"))
        } else {
            Self::provider(err.to_string())
        }
    }
}

/// 账本后端的错误
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("SQLite ledger error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Spreadsheet request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Ledger encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Ledger backend error: {message}")]
    Backend { message: String },
}

impl LedgerError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// 消息平台的错误
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Failed to send message: {message}")]
    Send { message: String },

    #[error("Failed to fetch media: {message}")]
    Media { message: String },
}

impl PlatformError {
    pub fn send(message: impl Into<String>) -> Self {
        Self::Send {
            message: message.into(),
        }
    }

    pub fn media(message: impl Into<String>) -> Self {
        Self::Media {
            message: message.into(),
        }
    }
}

impl From<RequestError> for PlatformError {
    fn from(err: RequestError) -> Self {
        Self::send(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum FinanceBotError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

pub type Result<T> = std::result::Result<T, FinanceBotError>;

impl FinanceBotError {
    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            FinanceBotError::Extraction(ExtractionError::EmptyInput) => ErrorSeverity::Low,
            FinanceBotError::Extraction(ExtractionError::Provider { .. }) => ErrorSeverity::Medium,
            FinanceBotError::Extraction(ExtractionError::MalformedResponse { .. }) => {
                ErrorSeverity::Medium
            }
            FinanceBotError::Ledger(_) => ErrorSeverity::High,
            FinanceBotError::Platform(_) => ErrorSeverity::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Low => write!(f, "LOW"),
            ErrorSeverity::Medium => write!(f, "MEDIUM"),
            ErrorSeverity::High => write!(f, "HIGH"),
        }
    }
}
