use std::sync::Arc;

use anyhow::Result;
use dotenv::dotenv;
use log::info;

use financebot::app::{build_controller, build_provider, build_sheet_backend, update_source};
use financebot::bot::{start_bot, TelegramMessenger};
use financebot::config::Settings;
use financebot::utils::Logger;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载环境变量
    dotenv().ok();

    // 初始化日志，未设置 RUST_LOG 时默认 info
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    Logger::log_operation_start("FinanceBot", "Initializing application");

    // 加载配置
    let settings = match Settings::new() {
        Ok(s) => {
            Logger::log_operation_success("Configuration", "Settings loaded successfully");
            s
        }
        Err(e) => {
            Logger::log_operation_failure("Configuration", &e.to_string());
            return Err(e);
        }
    };

    // 验证配置
    if let Err(e) = settings.validate() {
        Logger::log_operation_failure("Configuration validation", &e.to_string());
        return Err(e);
    }

    let provider = build_provider(&settings)?;

    // 初始化账本
    let backend = match build_sheet_backend(&settings).await {
        Ok(backend) => backend,
        Err(e) => {
            Logger::log_operation_failure("Ledger", &e.to_string());
            return Err(e);
        }
    };

    let bot = teloxide::Bot::new(&settings.telegram_bot_token);
    let messenger = Arc::new(TelegramMessenger::new(bot.clone()));
    let controller = Arc::new(build_controller(&settings, messenger, provider, backend));
    let source = update_source(&settings)?;

    info!("🤖 {} initialized successfully!", settings.bot_name);
    info!("📊 Configuration:");
    info!("  - AI provider: {:?}", settings.ai_provider);
    info!("  - Ledger: {:?}", settings.ledger_backend);
    info!("  - Request timeout: {}s", settings.request_timeout);
    info!("  - Recent limit: {}", settings.recent_limit);
    info!("  - Timezone offset: UTC{:+}", settings.timezone_offset_hours);

    start_bot(bot, controller, source).await
}
