use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Utc;
use log::{debug, error, info, warn};
use teloxide::{
    prelude::*,
    types::{MessageKind, PhotoSize},
    update_listeners::{webhooks, UpdateListener},
    utils::command::BotCommands,
    RequestError,
};

use crate::bot::controller::{DialogueController, InboundMessage, PhotoRef};
use crate::bot::webhook::with_handshake_route;

/// 注册到 Telegram 命令菜单的命令，实际路由由 DialogueCommand 完成
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "snake_case", description = "Available commands:")]
pub enum Command {
    #[command(description = "show the main menu")]
    Start,
    #[command(description = "show the weekly menu")]
    Weekly,
    #[command(description = "list the most recent transactions")]
    Recent,
    #[command(description = "spending report for the last 7 days")]
    WeeklyReport,
    #[command(description = "advice based on the last 7 days")]
    WeeklyAdvice,
}

/// How updates reach the bot.
pub enum UpdateSource {
    Polling,
    Webhook {
        listen_addr: SocketAddr,
        url: String,
        secret_token: Option<String>,
    },
}

fn largest_photo(sizes: &[PhotoSize]) -> Option<&PhotoSize> {
    sizes
        .iter()
        .max_by_key(|p| u64::from(p.width) * u64::from(p.height))
}

pub fn inbound_from_message(msg: &Message) -> InboundMessage {
    let photo = msg.photo().and_then(largest_photo).map(|p| PhotoRef {
        file_id: p.file.id.clone(),
        unique_id: p.file.unique_id.clone(),
    });

    InboundMessage {
        chat_id: msg.chat.id.0,
        sender_name: msg.from().map(|u| u.full_name()),
        text: msg.text().or_else(|| msg.caption()).map(str::to_string),
        photo,
        timestamp: msg.date.timestamp(),
    }
}

/// 按钮回调等价于用户发送了按钮 id
pub fn inbound_from_callback(query: &CallbackQuery) -> Option<InboundMessage> {
    let data = query.data.clone()?;
    let chat_id = query
        .message
        .as_ref()
        .map(|m| m.chat.id.0)
        .unwrap_or(query.from.id.0 as i64);

    Some(InboundMessage {
        chat_id,
        sender_name: Some(query.from.full_name()),
        text: Some(data),
        photo: None,
        timestamp: Utc::now().timestamp(),
    })
}

pub struct BotDispatcher {
    controller: Arc<DialogueController>,
}

impl BotDispatcher {
    pub fn new(controller: Arc<DialogueController>) -> Self {
        Self { controller }
    }

    pub async fn run(self, bot: Bot, source: UpdateSource) -> Result<()> {
        info!("🤖 Starting FinanceBot dispatcher...");

        let message_controller = self.controller.clone();
        let callback_controller = self.controller.clone();

        let handler = dptree::entry()
            .branch(
                Update::filter_message().branch(
                    dptree::filter(|msg: Message| matches!(msg.kind, MessageKind::Common(_)))
                        .endpoint(move |msg: Message| {
                            let controller = message_controller.clone();
                            async move {
                                let inbound = inbound_from_message(&msg);
                                debug!(
                                    "Handling message from chat: {}, photo: {}",
                                    inbound.chat_id,
                                    inbound.photo.is_some()
                                );
                                controller.handle(&inbound).await;
                                Ok::<(), RequestError>(())
                            }
                        }),
                ),
            )
            .branch(Update::filter_callback_query().endpoint(
                move |bot: Bot, query: CallbackQuery| {
                    let controller = callback_controller.clone();
                    async move {
                        // 先应答回调，避免按钮一直转圈
                        if let Err(e) = bot.answer_callback_query(query.id.clone()).await {
                            warn!("Failed to answer callback query: {e}");
                        }

                        match inbound_from_callback(&query) {
                            Some(inbound) => {
                                controller.handle(&inbound).await;
                            }
                            None => debug!("Callback query without data, ignoring"),
                        }
                        Ok::<(), RequestError>(())
                    }
                },
            ));

        let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
            .enable_ctrlc_handler()
            .build();

        match source {
            UpdateSource::Polling => {
                info!("📡 Using long polling");
                dispatcher.dispatch().await;
            }
            UpdateSource::Webhook {
                listen_addr,
                url,
                secret_token,
            } => {
                let url = url
                    .parse::<reqwest::Url>()
                    .map_err(|e| anyhow!("Invalid WEBHOOK_URL {url}: {e}"))?;
                let path = url.path().to_string();
                let expected_token = secret_token.clone().unwrap_or_default();

                let mut options = webhooks::Options::new(listen_addr, url);
                if let Some(token) = secret_token {
                    options = options.secret_token(token);
                }

                let (mut listener, stop_flag, router) = webhooks::axum_to_router(bot, options)
                    .await
                    .map_err(|e| anyhow!("Failed to set up webhook: {e}"))?;
                let router = with_handshake_route(router, &path, expected_token);

                let server = axum::Server::try_bind(&listen_addr)
                    .map_err(|e| anyhow!("Failed to bind {listen_addr}: {e}"))?;
                let stop_token = listener.stop_token();
                info!("🌐 Listening for webhook updates on {}{}", listen_addr, path);
                tokio::spawn(async move {
                    if let Err(e) = server
                        .serve(router.into_make_service())
                        .with_graceful_shutdown(stop_flag)
                        .await
                    {
                        error!("❌ Webhook server error: {e}");
                        stop_token.stop();
                    }
                });

                dispatcher
                    .dispatch_with_listener(
                        listener,
                        LoggingErrorHandler::with_custom_text("An error from the update listener"),
                    )
                    .await;
            }
        }

        Ok(())
    }
}

/// 启动机器人的主函数
pub async fn start_bot(
    bot: Bot,
    controller: Arc<DialogueController>,
    source: UpdateSource,
) -> Result<()> {
    info!("🚀 Initializing Telegram Bot...");

    // 获取机器人信息
    match bot.get_me().await {
        Ok(me) => {
            info!("✅ Bot connected successfully:");
            info!("  - Username: @{}", me.username());
            info!("  - Name: {}", me.first_name);
            info!("  - ID: {}", me.id);
        }
        Err(e) => {
            error!("❌ Failed to connect to Telegram Bot API: {e}");
            return Err(anyhow!("Bot connection failed: {}", e));
        }
    }

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register command menu: {e}");
    }

    info!("🎯 Starting message processing...");
    info!("📝 Send a transaction or a receipt photo to get started.");

    BotDispatcher::new(controller).run(bot, source).await
}
