use async_trait::async_trait;
use base64::Engine;

use crate::error::ExtractionError;

/// 下载后的图片，随提示词一起内联发送
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageData {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Guesses the MIME type from a platform file path, JPEG otherwise.
    pub fn mime_from_path(path: &str) -> &'static str {
        let path = path.to_lowercase();
        if path.ends_with(".png") {
            "image/png"
        } else if path.ends_with(".webp") {
            "image/webp"
        } else {
            "image/jpeg"
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

/// 语言模型提供方：提示词加可选图片，返回一段文本
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        image: Option<&ImageData>,
    ) -> Result<String, ExtractionError>;

    fn name(&self) -> &'static str;
}

/// Shared response check for HTTP providers: non-2xx is a provider error with a
/// truncated body for the log.
pub(crate) async fn read_success_body(
    response: reqwest::Response,
    provider: &str,
) -> Result<String, ExtractionError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let preview: String = body.chars().take(300).collect();
        return Err(ExtractionError::provider(format!(
            "{provider} API error {status}: {preview}"
        )));
    }
    Ok(body)
}
