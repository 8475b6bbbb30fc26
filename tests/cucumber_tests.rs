use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use cucumber::{given, then, when, World};
use tokio::sync::Mutex;

// 导入项目模块
use financebot::bot::controller::{DialogueController, InboundMessage, Reply};
use financebot::bot::traits::{Messenger, QuickReply};
use financebot::error::{ExtractionError, PlatformError};
use financebot::extraction::{CompletionProvider, ExtractionClient, ImageData};
use financebot::ledger::{LedgerStore, MemorySheet};
use financebot::utils::Timestamps;

const CHAT_ID: i64 = 777;

// 重用integration_tests中的Mock实现（精简版）
#[derive(Default)]
pub struct RecordingMessenger {
    pub sent: Mutex<Vec<(String, Vec<QuickReply>)>>,
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, _chat_id: i64, text: &str) -> Result<(), PlatformError> {
        self.sent.lock().await.push((text.to_string(), Vec::new()));
        Ok(())
    }

    async fn send_buttons(
        &self,
        _chat_id: i64,
        text: &str,
        buttons: &[QuickReply],
    ) -> Result<(), PlatformError> {
        self.sent.lock().await.push((text.to_string(), buttons.to_vec()));
        Ok(())
    }

    async fn fetch_media(&self, _file_id: &str) -> Result<ImageData, PlatformError> {
        Ok(ImageData::new(vec![1, 2, 3], "image/jpeg"))
    }
}

#[derive(Default)]
pub struct QueuedProvider {
    replies: Mutex<VecDeque<String>>,
    pub calls: Mutex<usize>,
}

#[async_trait]
impl CompletionProvider for QueuedProvider {
    async fn complete(
        &self,
        _prompt: &str,
        _image: Option<&ImageData>,
    ) -> Result<String, ExtractionError> {
        *self.calls.lock().await += 1;
        self.replies
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| ExtractionError::provider("language model unavailable"))
    }

    fn name(&self) -> &'static str {
        "queued"
    }
}

// World结构，管理测试状态
#[derive(World)]
#[world(init = Self::new)]
pub struct FinanceBotWorld {
    pub messenger: Arc<RecordingMessenger>,
    pub provider: Arc<QueuedProvider>,
    pub sheet: Arc<MemorySheet>,
    pub ledger: Arc<LedgerStore>,
    pub controller: DialogueController,
    pub last_reply: Option<Reply>,
}

impl fmt::Debug for FinanceBotWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinanceBotWorld")
            .field("last_reply", &self.last_reply)
            .finish()
    }
}

impl FinanceBotWorld {
    fn new() -> Self {
        let offset = Timestamps::offset(7);
        let messenger = Arc::new(RecordingMessenger::default());
        let provider = Arc::new(QueuedProvider::default());
        let sheet = Arc::new(MemorySheet::new());
        let ledger = Arc::new(LedgerStore::new(sheet.clone(), offset));
        let controller = DialogueController::new(
            messenger.clone(),
            Arc::new(ExtractionClient::new(provider.clone(), offset)),
            ledger.clone(),
            5,
            offset,
        );

        Self {
            messenger,
            provider,
            sheet,
            ledger,
            controller,
            last_reply: None,
        }
    }

    async fn deliver(&mut self, message: InboundMessage) {
        self.last_reply = Some(self.controller.handle(&message).await);
    }

    fn reply_text(&self) -> &str {
        self.last_reply.as_ref().map(Reply::text).unwrap_or_default()
    }
}

#[given("an empty ledger")]
async fn empty_ledger(world: &mut FinanceBotWorld) {
    assert!(world.sheet.snapshot().await.is_empty());
}

#[given("the ledger is unavailable")]
async fn ledger_unavailable(world: &mut FinanceBotWorld) {
    world.sheet.set_should_fail(true);
}

#[given(expr = "the language model extracts {string} of {int} paid by {string} as {string}")]
async fn model_extracts(
    world: &mut FinanceBotWorld,
    category: String,
    amount: i64,
    method: String,
    summary: String,
) {
    let reply = serde_json::json!({
        "category": category,
        "amount": amount,
        "payment_method": method,
        "type": "expense",
        "summary": summary,
        "items": []
    });
    world
        .provider
        .replies
        .lock()
        .await
        .push_back(format!("```json\n{reply}\n```"));
}

#[given(expr = "the language model answers {string}")]
async fn model_answers(world: &mut FinanceBotWorld, answer: String) {
    world.provider.replies.lock().await.push_back(answer);
}

#[when(expr = "the user sends {string}")]
async fn user_sends(world: &mut FinanceBotWorld, text: String) {
    world
        .deliver(InboundMessage::text(CHAT_ID, text, Utc::now().timestamp()))
        .await;
}

#[when(expr = "the user sends {string} twice")]
async fn user_sends_twice(world: &mut FinanceBotWorld, text: String) {
    let message = InboundMessage::text(CHAT_ID, text, Utc::now().timestamp());
    world.deliver(message.clone()).await;
    world.deliver(message).await;
}

#[when("the user sends an empty message")]
async fn user_sends_empty(world: &mut FinanceBotWorld) {
    world
        .deliver(InboundMessage {
            chat_id: CHAT_ID,
            sender_name: None,
            text: None,
            photo: None,
            timestamp: Utc::now().timestamp(),
        })
        .await;
}

#[then(expr = "the ledger contains {int} transaction(s)")]
async fn ledger_contains(world: &mut FinanceBotWorld, count: usize) {
    world.sheet.set_should_fail(false);
    let rows = world.ledger.read_all().await.expect("ledger should be readable");
    assert_eq!(rows.len(), count);
}

#[then(expr = "the reply contains {string}")]
async fn reply_contains(world: &mut FinanceBotWorld, expected: String) {
    let text = world.reply_text();
    assert!(text.contains(&expected), "reply {text:?} lacks {expected:?}");
}

#[then(expr = "the reply lists {string} before {string}")]
async fn reply_lists_in_order(world: &mut FinanceBotWorld, first: String, second: String) {
    let text = world.reply_text();
    let first_at = text.find(&first).expect("first entry missing");
    let second_at = text.find(&second).expect("second entry missing");
    assert!(first_at < second_at, "{first:?} should come before {second:?}");
}

#[then(expr = "the reply is {string}")]
async fn reply_is(world: &mut FinanceBotWorld, expected: String) {
    assert_eq!(world.reply_text(), expected);
}

#[then(expr = "the reply offers the buttons {string} and {string}")]
async fn reply_offers_buttons(world: &mut FinanceBotWorld, first: String, second: String) {
    match &world.last_reply {
        Some(Reply::Choices { buttons, .. }) => {
            let ids: Vec<_> = buttons.iter().map(|b| b.id.clone()).collect();
            assert_eq!(ids, vec![first, second]);
        }
        other => panic!("expected a choice reply, got {other:?}"),
    }
}

#[then(expr = "{int} replies were sent")]
async fn replies_sent(world: &mut FinanceBotWorld, count: usize) {
    assert_eq!(world.messenger.sent.lock().await.len(), count);
}

#[then(expr = "the language model was called {int} time(s)")]
async fn model_called(world: &mut FinanceBotWorld, count: usize) {
    assert_eq!(*world.provider.calls.lock().await, count);
}

#[tokio::main]
async fn main() {
    FinanceBotWorld::run("tests/features").await;
}
