use async_trait::async_trait;
use log::{debug, info};
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::bot::traits::{Messenger, QuickReply};
use crate::error::PlatformError;
use crate::extraction::ImageData;

/// Telegram 实现，按钮使用 inline keyboard，回调数据即按钮 id
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn keyboard(buttons: &[QuickReply]) -> InlineKeyboardMarkup {
        let row = buttons
            .iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.id.clone()))
            .collect::<Vec<_>>();
        InlineKeyboardMarkup::new(vec![row])
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), PlatformError> {
        self.bot.send_message(ChatId(chat_id), text).await?;
        debug!("Sent text to chat {}", chat_id);
        Ok(())
    }

    async fn send_buttons(
        &self,
        chat_id: i64,
        text: &str,
        buttons: &[QuickReply],
    ) -> Result<(), PlatformError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .reply_markup(Self::keyboard(buttons))
            .await?;
        debug!("Sent {} buttons to chat {}", buttons.len(), chat_id);
        Ok(())
    }

    async fn fetch_media(&self, file_id: &str) -> Result<ImageData, PlatformError> {
        let file = self
            .bot
            .get_file(file_id)
            .await
            .map_err(|e| PlatformError::media(format!("failed to get file info: {e}")))?;

        let mut data = Vec::new();
        self.bot
            .download_file(&file.path, &mut data)
            .await
            .map_err(|e| PlatformError::media(format!("failed to download file: {e}")))?;

        let mime_type = ImageData::mime_from_path(&file.path);
        info!("📥 Downloaded image ({} bytes, {})", data.len(), mime_type);
        Ok(ImageData::new(data, mime_type))
    }
}
