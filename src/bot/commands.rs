use crate::bot::traits::QuickReply;

/// 固定的命令关键字，整条消息匹配，不区分大小写
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueCommand {
    Start,
    Weekly,
    Recent,
    WeeklyReport,
    WeeklyAdvice,
}

impl DialogueCommand {
    pub const ALL: [DialogueCommand; 5] = [
        DialogueCommand::Start,
        DialogueCommand::Weekly,
        DialogueCommand::Recent,
        DialogueCommand::WeeklyReport,
        DialogueCommand::WeeklyAdvice,
    ];

    /// Matches the whole message body. A single leading `/` is accepted so the
    /// Telegram `/start` deep link lands on the same command.
    pub fn classify(text: &str) -> Option<Self> {
        let normalized = text.trim().to_lowercase();
        let token = normalized.strip_prefix('/').unwrap_or(normalized.as_str());

        Self::ALL.into_iter().find(|cmd| cmd.token() == token)
    }

    pub fn token(&self) -> &'static str {
        match self {
            DialogueCommand::Start => "start",
            DialogueCommand::Weekly => "weekly",
            DialogueCommand::Recent => "recent",
            DialogueCommand::WeeklyReport => "weekly_report",
            DialogueCommand::WeeklyAdvice => "weekly_advice",
        }
    }

    fn button(&self, label: &str) -> QuickReply {
        QuickReply::new(self.token(), label)
    }
}

pub fn start_menu() -> (&'static str, Vec<QuickReply>) {
    (
        "👋 Hi! Send me a transaction like \"beli nasi padang 15000 cash\" or a receipt photo.\n\nOr pick an option:",
        vec![
            DialogueCommand::Recent.button("Recent transactions"),
            DialogueCommand::Weekly.button("Weekly menu"),
        ],
    )
}

pub fn weekly_menu() -> (&'static str, Vec<QuickReply>) {
    (
        "📊 Weekly menu:",
        vec![
            DialogueCommand::WeeklyReport.button("Weekly report"),
            DialogueCommand::WeeklyAdvice.button("Weekly advice"),
        ],
    )
}
