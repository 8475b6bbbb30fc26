use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiProvider {
    OpenAi,
    Gemini,
}

impl AiProvider {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "openai" | "chatgpt" => Ok(AiProvider::OpenAi),
            "gemini" => Ok(AiProvider::Gemini),
            other => Err(anyhow!("Unknown AI_PROVIDER: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerBackendKind {
    Sqlite,
    GoogleSheets,
}

impl LedgerBackendKind {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "sqlite" => Ok(LedgerBackendKind::Sqlite),
            "google_sheets" | "sheets" => Ok(LedgerBackendKind::GoogleSheets),
            other => Err(anyhow!("Unknown LEDGER_BACKEND: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub telegram_bot_token: String,
    pub bot_name: String,
    pub ai_provider: AiProvider,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub ledger_backend: LedgerBackendKind,
    pub ledger_path: String,
    pub google_sheet_id: Option<String>,
    pub google_sheet_tab: String,
    pub google_sheets_access_token: Option<String>,
    pub webhook_url: Option<String>,
    pub webhook_listen_addr: String,
    pub verify_token: Option<String>,
    pub request_timeout: u64,
    pub recent_limit: usize,
    pub timezone_offset_hours: i32,
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Settings {
    pub fn new() -> Result<Self> {
        let telegram_bot_token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        let bot_name = env::var("BOT_NAME").unwrap_or_else(|_| "FinanceBot".to_string());

        let ai_provider = match optional("AI_PROVIDER") {
            Some(value) => AiProvider::parse(&value)?,
            None => AiProvider::OpenAi,
        };

        let ledger_backend = match optional("LEDGER_BACKEND") {
            Some(value) => LedgerBackendKind::parse(&value)?,
            None => LedgerBackendKind::Sqlite,
        };

        let request_timeout = env::var("REQUEST_TIMEOUT")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .unwrap_or(30);

        let recent_limit = env::var("RECENT_LIMIT")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<usize>()
            .unwrap_or(5);

        let timezone_offset_hours = env::var("TIMEZONE_OFFSET_HOURS")
            .unwrap_or_else(|_| "7".to_string())
            .parse::<i32>()
            .unwrap_or(7);

        Ok(Settings {
            telegram_bot_token,
            bot_name,
            ai_provider,
            openai_api_key: optional("OPENAI_API_KEY"),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            gemini_api_key: optional("GEMINI_API_KEY"),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            ledger_backend,
            ledger_path: env::var("LEDGER_PATH").unwrap_or_else(|_| "ledger.db".to_string()),
            google_sheet_id: optional("GOOGLE_SHEET_ID"),
            google_sheet_tab: env::var("GOOGLE_SHEET_TAB").unwrap_or_else(|_| "Sheet1".to_string()),
            google_sheets_access_token: optional("GOOGLE_SHEETS_ACCESS_TOKEN"),
            webhook_url: optional("WEBHOOK_URL"),
            webhook_listen_addr: env::var("WEBHOOK_LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            verify_token: optional("VERIFY_TOKEN"),
            request_timeout,
            recent_limit,
            timezone_offset_hours,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram_bot_token.is_empty() {
            return Err(anyhow!("Telegram bot token cannot be empty"));
        }

        match self.ai_provider {
            AiProvider::OpenAi if self.openai_api_key.is_none() => {
                return Err(anyhow!("OPENAI_API_KEY must be set when AI_PROVIDER=openai"));
            }
            AiProvider::Gemini if self.gemini_api_key.is_none() => {
                return Err(anyhow!("GEMINI_API_KEY must be set when AI_PROVIDER=gemini"));
            }
            _ => {}
        }

        match self.ledger_backend {
            LedgerBackendKind::Sqlite if self.ledger_path.is_empty() => {
                return Err(anyhow!("LEDGER_PATH cannot be empty"));
            }
            LedgerBackendKind::GoogleSheets
                if self.google_sheet_id.is_none() || self.google_sheets_access_token.is_none() =>
            {
                return Err(anyhow!(
                    "GOOGLE_SHEET_ID and GOOGLE_SHEETS_ACCESS_TOKEN must be set for the google_sheets backend"
                ));
            }
            _ => {}
        }

        if self.request_timeout == 0 || self.request_timeout > 120 {
            return Err(anyhow!("Request timeout must be between 1 and 120 seconds"));
        }

        if self.recent_limit == 0 {
            return Err(anyhow!("Recent limit must be greater than 0"));
        }

        if !(-12..=14).contains(&self.timezone_offset_hours) {
            return Err(anyhow!("Timezone offset must be between -12 and +14 hours"));
        }

        if self.webhook_url.is_some() {
            self.listen_addr()?;
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.webhook_listen_addr
            .parse()
            .map_err(|e| anyhow!("Invalid WEBHOOK_LISTEN_ADDR {}: {e}", self.webhook_listen_addr))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            telegram_bot_token: String::new(),
            bot_name: "FinanceBot".to_string(),
            ai_provider: AiProvider::OpenAi,
            openai_api_key: None,
            openai_model: "gpt-4o".to_string(),
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            ledger_backend: LedgerBackendKind::Sqlite,
            ledger_path: "ledger.db".to_string(),
            google_sheet_id: None,
            google_sheet_tab: "Sheet1".to_string(),
            google_sheets_access_token: None,
            webhook_url: None,
            webhook_listen_addr: "0.0.0.0:8000".to_string(),
            verify_token: None,
            request_timeout: 30,
            recent_limit: 5,
            timezone_offset_hours: 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Settings {
        Settings {
            telegram_bot_token: "123:abc".to_string(),
            openai_api_key: Some("sk-test".to_string()),
            ..Settings::default()
        }
    }

    #[test]
    fn test_provider_aliases() {
        assert_eq!(AiProvider::parse("ChatGPT").unwrap(), AiProvider::OpenAi);
        assert_eq!(AiProvider::parse(" gemini ").unwrap(), AiProvider::Gemini);
        assert!(AiProvider::parse("claude").is_err());
        assert_eq!(
            LedgerBackendKind::parse("google_sheets").unwrap(),
            LedgerBackendKind::GoogleSheets
        );
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());

        let missing_key = Settings {
            ai_provider: AiProvider::Gemini,
            ..valid()
        };
        assert!(missing_key.validate().is_err());

        let sheets_without_token = Settings {
            ledger_backend: LedgerBackendKind::GoogleSheets,
            google_sheet_id: Some("sheet".to_string()),
            ..valid()
        };
        assert!(sheets_without_token.validate().is_err());

        let zero_timeout = Settings {
            request_timeout: 0,
            ..valid()
        };
        assert!(zero_timeout.validate().is_err());

        let bad_addr = Settings {
            webhook_url: Some("https://example.com/webhook".to_string()),
            webhook_listen_addr: "not-an-addr".to_string(),
            ..valid()
        };
        assert!(bad_addr.validate().is_err());
    }
}
