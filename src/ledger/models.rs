use serde::{Deserialize, Serialize};

use crate::utils::Formatter;

/// 账本固定列顺序，历史数据依赖这个顺序
pub const LEDGER_HEADER: [&str; 8] = [
    "timestamp",
    "source_text",
    "category",
    "amount",
    "payment_method",
    "type",
    "summary",
    "items",
];

pub const IMAGE_PLACEHOLDER: &str = "image";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Expense,
    Income,
    Transfer,
}

impl TransactionType {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        if value.contains("transfer") {
            return Some(TransactionType::Transfer);
        }
        match value.as_str() {
            "expense" | "pengeluaran" | "outcome" | "spending" => Some(TransactionType::Expense),
            "income" | "pemasukan" | "salary" => Some(TransactionType::Income),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Expense => "expense",
            TransactionType::Income => "income",
            TransactionType::Transfer => "transfer",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "cash")]
    Cash,
    #[serde(rename = "bank")]
    Bank,
    #[serde(rename = "e-wallet")]
    EWallet,
    #[serde(rename = "other")]
    Other,
}

impl PaymentMethod {
    /// Maps provider spellings (bank names, wallet brands) onto the closed set.
    pub fn parse(value: &str) -> Self {
        let value = value.trim().to_lowercase();
        if value.is_empty() {
            return PaymentMethod::Other;
        }

        const BANKS: [&str; 9] = [
            "bank", "debit", "credit", "bca", "bni", "bri", "mandiri", "card", "kartu",
        ];
        const WALLETS: [&str; 8] = [
            "wallet", "dana", "gopay", "ovo", "shopeepay", "linkaja", "qris", "jenius",
        ];

        if value == "cash" || value == "tunai" {
            PaymentMethod::Cash
        } else if WALLETS.iter().any(|w| value.contains(w)) {
            PaymentMethod::EWallet
        } else if BANKS.iter().any(|b| value.contains(b)) {
            PaymentMethod::Bank
        } else {
            PaymentMethod::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Bank => "bank",
            PaymentMethod::EWallet => "e-wallet",
            PaymentMethod::Other => "other",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub timestamp: String,
    pub source_text: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: String,
    pub payment_method: PaymentMethod,
    pub summary: String,
    pub items: Vec<Item>,
}

/// 持久化的一行，所有单元格都保留为字符串
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub timestamp: String,
    pub source_text: String,
    pub category: String,
    pub amount: String,
    pub payment_method: String,
    pub kind: String,
    pub summary: String,
    pub items: String,
}

/// 纯图片消息的原文只是 `image:<id>`，把模型读出的描述并入 summary
fn row_summary(record: &TransactionRecord, raw_text: &str) -> String {
    let description = record.source_text.trim();
    let image_only = raw_text.starts_with("image:");
    if !image_only
        || description.is_empty()
        || description == IMAGE_PLACEHOLDER
        || record.summary.contains(description)
    {
        return record.summary.clone();
    }

    if record.summary.trim().is_empty() {
        description.to_string()
    } else {
        format!("{} ({})", record.summary, description)
    }
}

impl LedgerRow {
    pub fn from_record(record: &TransactionRecord, raw_text: &str) -> Self {
        let items = serde_json::to_string(&record.items).unwrap_or_else(|_| "[]".to_string());
        Self {
            timestamp: record.timestamp.clone(),
            source_text: raw_text.to_string(),
            category: record.category.clone(),
            amount: Formatter::format_amount_cell(record.amount),
            payment_method: record.payment_method.to_string(),
            kind: record.kind.to_string(),
            summary: row_summary(record, raw_text),
            items,
        }
    }

    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.source_text.clone(),
            self.category.clone(),
            self.amount.clone(),
            self.payment_method.clone(),
            self.kind.clone(),
            self.summary.clone(),
            self.items.clone(),
        ]
    }

    /// Reads a sheet row back. Six-cell rows written by the earlier layouts are
    /// mapped onto the canonical columns; short rows are padded with empty cells.
    pub fn from_cells(cells: &[String]) -> Self {
        let cell = |i: usize| cells.get(i).cloned().unwrap_or_default();

        if cells.len() == 6 {
            // 旧格式: timestamp, text, category, amount, (type | payment_method), summary
            let fifth = cell(4);
            let (payment_method, kind) = match TransactionType::parse(&fifth) {
                Some(kind) => (String::new(), kind.to_string()),
                None => (fifth, String::new()),
            };
            return Self {
                timestamp: cell(0),
                source_text: cell(1),
                category: cell(2),
                amount: cell(3),
                payment_method,
                kind,
                summary: cell(5),
                items: String::new(),
            };
        }

        Self {
            timestamp: cell(0),
            source_text: cell(1),
            category: cell(2),
            amount: cell(3),
            payment_method: cell(4),
            kind: cell(5),
            summary: cell(6),
            items: cell(7),
        }
    }

    pub fn parsed_items(&self) -> Vec<Item> {
        serde_json::from_str(&self.items).unwrap_or_default()
    }
}

pub fn header_cells() -> Vec<String> {
    LEDGER_HEADER.iter().map(|h| h.to_string()).collect()
}

/// 第一行是否为表头
pub fn is_header(cells: &[String]) -> bool {
    cells
        .first()
        .map(|c| c.trim().eq_ignore_ascii_case("timestamp"))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    Duplicate,
}
