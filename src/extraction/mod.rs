pub mod client;
pub mod gemini;
pub mod normalize;
pub mod openai;
pub mod prompts;
pub mod provider;

pub use client::ExtractionClient;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use provider::{CompletionProvider, ImageData};
