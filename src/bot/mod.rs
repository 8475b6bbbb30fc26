pub mod commands;
pub mod controller;
pub mod dispatcher;
pub mod telegram;
pub mod traits;
pub mod webhook;

pub use commands::DialogueCommand;
pub use controller::{DialogueController, InboundMessage, PhotoRef, Reply, Route};
pub use dispatcher::{start_bot, UpdateSource};
pub use telegram::TelegramMessenger;
pub use traits::{Messenger, QuickReply};
pub use webhook::{handshake_response, verify_subscription, with_handshake_route};
