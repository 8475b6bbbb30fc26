use async_trait::async_trait;

use crate::error::PlatformError;
use crate::extraction::ImageData;

/// 快捷回复按钮：id 作为回调数据，label 显示给用户
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickReply {
    pub id: String,
    pub label: String,
}

impl QuickReply {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// 抽象消息平台操作的trait，用于测试时mock
#[async_trait]
pub trait Messenger: Send + Sync {
    /// 发送文本消息
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), PlatformError>;

    /// 发送带快捷回复按钮的消息
    async fn send_buttons(
        &self,
        chat_id: i64,
        text: &str,
        buttons: &[QuickReply],
    ) -> Result<(), PlatformError>;

    /// 下载消息附带的图片
    async fn fetch_media(&self, file_id: &str) -> Result<ImageData, PlatformError>;
}
