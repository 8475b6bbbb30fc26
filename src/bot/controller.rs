use std::sync::Arc;

use chrono::FixedOffset;
use log::{debug, error, info, warn};

use crate::bot::commands::{start_menu, weekly_menu, DialogueCommand};
use crate::bot::traits::{Messenger, QuickReply};
use crate::error::{ExtractionError, FinanceBotError, PlatformError, Result};
use crate::extraction::{ExtractionClient, ImageData};
use crate::ledger::{AppendOutcome, LedgerRow, LedgerStore, TransactionRecord};
use crate::utils::{parse_amount, Formatter, Logger, Timestamps};

const USAGE_EXAMPLE: &str = "Example: beli nasi padang 15000 cash";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRef {
    pub file_id: String,
    /// 同一张图片在重复投递时保持不变
    pub unique_id: String,
}

/// 平台无关的入站消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub sender_name: Option<String>,
    pub text: Option<String>,
    pub photo: Option<PhotoRef>,
    /// Unix seconds, as delivered by the platform.
    pub timestamp: i64,
}

impl InboundMessage {
    pub fn text(chat_id: i64, text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            chat_id,
            sender_name: None,
            text: Some(text.into()),
            photo: None,
            timestamp,
        }
    }

    fn trimmed_text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Second half of the ledger dedup key.
    pub fn raw_text(&self) -> String {
        match (self.trimmed_text(), &self.photo) {
            (Some(text), _) => text.to_string(),
            (None, Some(photo)) => format!("image:{}", photo.unique_id),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Command(DialogueCommand),
    Transaction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Choices { text: String, buttons: Vec<QuickReply> },
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Text(text) => text,
            Reply::Choices { text, .. } => text,
        }
    }

    fn choices((text, buttons): (&str, Vec<QuickReply>)) -> Self {
        Reply::Choices {
            text: text.to_string(),
            buttons,
        }
    }
}

/// 每条消息只回复一次；任何错误都转换成给用户的回复
pub struct DialogueController {
    messenger: Arc<dyn Messenger>,
    extraction: Arc<ExtractionClient>,
    ledger: Arc<LedgerStore>,
    recent_limit: usize,
    offset: FixedOffset,
}

impl DialogueController {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        extraction: Arc<ExtractionClient>,
        ledger: Arc<LedgerStore>,
        recent_limit: usize,
        offset: FixedOffset,
    ) -> Self {
        Self {
            messenger,
            extraction,
            ledger,
            recent_limit,
            offset,
        }
    }

    pub fn route(message: &InboundMessage) -> Route {
        // 图片消息总是交易，不能作为命令
        if message.photo.is_some() {
            return Route::Transaction;
        }
        match message.trimmed_text().and_then(DialogueCommand::classify) {
            Some(command) => Route::Command(command),
            None => Route::Transaction,
        }
    }

    /// Computes the reply for one message and sends it. Send failures are
    /// logged and not retried.
    pub async fn handle(&self, message: &InboundMessage) -> Reply {
        debug!(
            "Handling message from chat {} ({:?})",
            message.chat_id, message.sender_name
        );

        let reply = self.respond(message).await;

        if let Err(e) = self.send(message.chat_id, &reply).await {
            error!("Failed to send reply to chat {}: {}", message.chat_id, e);
        }
        reply
    }

    pub async fn respond(&self, message: &InboundMessage) -> Reply {
        match Self::route(message) {
            Route::Command(command) => {
                info!("📨 Command {} from chat {}", command.token(), message.chat_id);
                self.dispatch_command(command).await
            }
            Route::Transaction => match self.record_transaction(message).await {
                Ok(text) => Reply::Text(text),
                Err(e) => {
                    Logger::log_operation_failure(
                        "Transaction pipeline",
                        &format!("[{}] {}", e.severity(), e),
                    );
                    Reply::Text(pipeline_error_reply(&e))
                }
            },
        }
    }

    async fn send(&self, chat_id: i64, reply: &Reply) -> std::result::Result<(), PlatformError> {
        match reply {
            Reply::Text(text) => self.messenger.send_text(chat_id, text).await,
            Reply::Choices { text, buttons } => {
                self.messenger.send_buttons(chat_id, text, buttons).await
            }
        }
    }

    async fn dispatch_command(&self, command: DialogueCommand) -> Reply {
        let result = match command {
            DialogueCommand::Start => return Reply::choices(start_menu()),
            DialogueCommand::Weekly => return Reply::choices(weekly_menu()),
            DialogueCommand::Recent => self.recent_reply().await,
            DialogueCommand::WeeklyReport => self.weekly_report_reply().await,
            DialogueCommand::WeeklyAdvice => self.weekly_advice_reply().await,
        };

        match result {
            Ok(text) => Reply::Text(text),
            Err(e) => {
                Logger::log_operation_failure(
                    command.token(),
                    &format!("[{}] {}", e.severity(), e),
                );
                Reply::Text(command_error_reply(&e))
            }
        }
    }

    async fn recent_reply(&self) -> Result<String> {
        let rows = self.ledger.recent(self.recent_limit).await?;
        if rows.is_empty() {
            return Ok("No transactions found.".to_string());
        }

        let formatted = rows.iter().map(format_recent_row).collect::<Vec<_>>();
        Ok(format!("📌 *Recent transactions:*\n\n{}", formatted.join("\n\n")))
    }

    async fn weekly_report_reply(&self) -> Result<String> {
        let weekly = self
            .ledger
            .weekly_aggregate(Timestamps::now(self.offset))
            .await?;
        if weekly.is_empty() {
            return Ok("No transactions in the last 7 days.".to_string());
        }
        Ok(format!("📊 *Weekly report*\n\n{}", weekly.report))
    }

    async fn weekly_advice_reply(&self) -> Result<String> {
        let weekly = self
            .ledger
            .weekly_aggregate(Timestamps::now(self.offset))
            .await?;
        if weekly.is_empty() {
            return Ok("No transactions in the last 7 days, nothing to advise on yet.".to_string());
        }

        Logger::log_operation_start("Weekly advice", &format!("{} groups", weekly.entries.len()));
        let advice = self.extraction.advise(&weekly.csv).await?;
        Logger::log_operation_success("Weekly advice", &format!("{} chars", advice.len()));
        Ok(advice)
    }

    async fn record_transaction(&self, message: &InboundMessage) -> Result<String> {
        let image = match &message.photo {
            Some(photo) => Some(self.fetch_image(photo).await?),
            None => None,
        };

        let text = message.trimmed_text();
        let fallback_timestamp = Timestamps::format_unix(message.timestamp, self.offset);

        let record = self
            .extraction
            .extract(text, image.as_ref(), &fallback_timestamp)
            .await?;

        let raw_text = message.raw_text();
        let outcome = self.ledger.append(&record, &raw_text).await?;
        if outcome == AppendOutcome::Duplicate {
            info!("Redelivered message from chat {}, confirming again", message.chat_id);
        }

        Ok(format_confirmation(&record))
    }

    async fn fetch_image(&self, photo: &PhotoRef) -> Result<ImageData> {
        let image = self.messenger.fetch_media(&photo.file_id).await?;
        if image.is_empty() {
            warn!("Downloaded photo {} is empty", photo.file_id);
            return Err(PlatformError::media("downloaded photo is empty").into());
        }
        Ok(image)
    }
}

pub fn format_confirmation(record: &TransactionRecord) -> String {
    let mut text = format!(
        "✅ Transaction recorded!\nTime: {}\nSummary: {}\nAmount: {}\nCategory: {}\nMethod: {}\nType: {}",
        record.timestamp,
        record.summary,
        Formatter::format_rupiah(record.amount),
        record.category,
        record.payment_method,
        record.kind
    );

    if !record.items.is_empty() {
        text.push_str("\nItems:");
        for item in &record.items {
            text.push_str(&format!(
                "\n• {} x{} @ {}",
                item.name,
                item.quantity,
                Formatter::format_rupiah(item.unit_price)
            ));
        }
    }
    text
}

fn format_recent_row(row: &LedgerRow) -> String {
    let amount = parse_amount(&row.amount)
        .map(|a| Formatter::format_rupiah(a as f64))
        .unwrap_or_else(|| row.amount.clone());
    let method = if row.payment_method.is_empty() {
        "-"
    } else {
        row.payment_method.as_str()
    };

    format!(
        "{}\n{} *{}* - {} ({})\n   {}",
        row.timestamp,
        Formatter::category_icon(&row.category),
        row.category,
        amount,
        method,
        row.summary
    )
}

fn pipeline_error_reply(error: &FinanceBotError) -> String {
    match error {
        FinanceBotError::Extraction(ExtractionError::EmptyInput) => format!(
            "🤔 Please send a transaction as text or a receipt photo.\n\n{USAGE_EXAMPLE}"
        ),
        FinanceBotError::Ledger(_) => {
            "⚠️ The transaction was read but may not be saved. Please check the ledger and try again."
                .to_string()
        }
        _ => format!("❌ Sorry, I couldn't process that transaction. Please try again.\n\n{USAGE_EXAMPLE}"),
    }
}

fn command_error_reply(error: &FinanceBotError) -> String {
    match error {
        FinanceBotError::Ledger(_) => {
            "⚠️ Couldn't read the ledger right now. Please try again later.".to_string()
        }
        _ => "❌ Sorry, something went wrong. Please try again later.".to_string(),
    }
}
