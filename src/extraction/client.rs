use std::sync::Arc;

use chrono::FixedOffset;
use log::{debug, error, info};

use crate::error::ExtractionError;
use crate::extraction::normalize::{parse_completion, record_from_json, ExtractionContext};
use crate::extraction::prompts::{advice_prompt, extraction_prompt};
use crate::extraction::provider::{CompletionProvider, ImageData};
use crate::ledger::models::TransactionRecord;

/// 把消息文本或图片交给语言模型，得到一条结构化交易
pub struct ExtractionClient {
    provider: Arc<dyn CompletionProvider>,
    offset: FixedOffset,
}

impl ExtractionClient {
    pub fn new(provider: Arc<dyn CompletionProvider>, offset: FixedOffset) -> Self {
        Self { provider, offset }
    }

    /// At least one of `text` or `image` must be present. `fallback_timestamp`
    /// is used whenever the model does not return a usable timestamp.
    pub async fn extract(
        &self,
        text: Option<&str>,
        image: Option<&ImageData>,
        fallback_timestamp: &str,
    ) -> Result<TransactionRecord, ExtractionError> {
        let text = text.map(str::trim).filter(|t| !t.is_empty());
        let image = image.filter(|i| !i.is_empty());
        if text.is_none() && image.is_none() {
            return Err(ExtractionError::EmptyInput);
        }

        let prompt = extraction_prompt(text, image.is_some());
        info!(
            "🤖 Extracting transaction via {} (text: {}, image: {})",
            self.provider.name(),
            text.is_some(),
            image.is_some()
        );

        let completion = self.provider.complete(&prompt, image).await?;
        if completion.trim().is_empty() {
            return Err(ExtractionError::provider("empty completion"));
        }
        debug!("Raw completion: {}", completion);

        let map = parse_completion(&completion).map_err(|e| {
            error!("Unparseable model response: {}", completion);
            e
        })?;

        Ok(record_from_json(
            &map,
            ExtractionContext {
                text,
                fallback_timestamp,
                offset: self.offset,
            },
        ))
    }

    /// Free-form spending advice for an aggregated week.
    pub async fn advise(&self, csv: &str) -> Result<String, ExtractionError> {
        let completion = self.provider.complete(&advice_prompt(csv), None).await?;
        let advice = completion.trim();
        if advice.is_empty() {
            return Err(ExtractionError::provider("empty advice completion"));
        }
        Ok(advice.to_string())
    }
}
