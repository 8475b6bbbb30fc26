use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::bot::{DialogueController, Messenger, UpdateSource};
use crate::config::{AiProvider, LedgerBackendKind, Settings};
use crate::extraction::{CompletionProvider, ExtractionClient, GeminiProvider, OpenAiProvider};
use crate::ledger::{GoogleSheet, LedgerStore, SheetBackend, SqliteSheet};
use crate::utils::{Logger, Timestamps};

/// 根据配置选择语言模型提供方
pub fn build_provider(settings: &Settings) -> Result<Arc<dyn CompletionProvider>> {
    let provider: Arc<dyn CompletionProvider> = match settings.ai_provider {
        AiProvider::OpenAi => {
            let key = settings
                .openai_api_key
                .clone()
                .ok_or_else(|| anyhow!("OPENAI_API_KEY is not set"))?;
            Arc::new(OpenAiProvider::new(
                key,
                settings.openai_model.clone(),
                settings.timeout(),
            )?)
        }
        AiProvider::Gemini => {
            let key = settings
                .gemini_api_key
                .clone()
                .ok_or_else(|| anyhow!("GEMINI_API_KEY is not set"))?;
            Arc::new(GeminiProvider::new(
                key,
                settings.gemini_model.clone(),
                settings.timeout(),
            )?)
        }
    };

    Logger::log_operation_success("Language model", provider.name());
    Ok(provider)
}

pub async fn build_sheet_backend(settings: &Settings) -> Result<Arc<dyn SheetBackend>> {
    let backend: Arc<dyn SheetBackend> = match settings.ledger_backend {
        LedgerBackendKind::Sqlite => Arc::new(SqliteSheet::new(&settings.ledger_path).await?),
        LedgerBackendKind::GoogleSheets => {
            let sheet_id = settings
                .google_sheet_id
                .clone()
                .ok_or_else(|| anyhow!("GOOGLE_SHEET_ID is not set"))?;
            let token = settings
                .google_sheets_access_token
                .clone()
                .ok_or_else(|| anyhow!("GOOGLE_SHEETS_ACCESS_TOKEN is not set"))?;
            Arc::new(GoogleSheet::new(
                sheet_id,
                settings.google_sheet_tab.clone(),
                token,
                settings.timeout(),
            )?)
        }
    };

    Logger::log_operation_success("Ledger", backend.name());
    Ok(backend)
}

pub fn build_controller(
    settings: &Settings,
    messenger: Arc<dyn Messenger>,
    provider: Arc<dyn CompletionProvider>,
    backend: Arc<dyn SheetBackend>,
) -> DialogueController {
    let offset = Timestamps::offset(settings.timezone_offset_hours);
    DialogueController::new(
        messenger,
        Arc::new(ExtractionClient::new(provider, offset)),
        Arc::new(LedgerStore::new(backend, offset)),
        settings.recent_limit,
        offset,
    )
}

pub fn update_source(settings: &Settings) -> Result<UpdateSource> {
    match &settings.webhook_url {
        Some(url) => Ok(UpdateSource::Webhook {
            listen_addr: settings.listen_addr()?,
            url: url.clone(),
            secret_token: settings.verify_token.clone(),
        }),
        None => Ok(UpdateSource::Polling),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_follows_configuration() {
        let settings = Settings {
            ai_provider: AiProvider::Gemini,
            gemini_api_key: Some("g-key".to_string()),
            ..Settings::default()
        };
        assert_eq!(build_provider(&settings).unwrap().name(), "gemini");

        let settings = Settings {
            openai_api_key: Some("sk-test".to_string()),
            ..Settings::default()
        };
        assert_eq!(build_provider(&settings).unwrap().name(), "openai");

        assert!(build_provider(&Settings::default()).is_err());
    }

    #[test]
    fn test_update_source() {
        assert!(matches!(
            update_source(&Settings::default()).unwrap(),
            UpdateSource::Polling
        ));

        let settings = Settings {
            webhook_url: Some("https://bot.example.com/telegram".to_string()),
            verify_token: Some("s3cret".to_string()),
            ..Settings::default()
        };
        match update_source(&settings).unwrap() {
            UpdateSource::Webhook {
                listen_addr,
                secret_token,
                ..
            } => {
                assert_eq!(listen_addr.port(), 8000);
                assert_eq!(secret_token.as_deref(), Some("s3cret"));
            }
            UpdateSource::Polling => panic!("expected webhook"),
        }
    }
}
