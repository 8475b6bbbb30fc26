//! Turns a free-form model completion into a `TransactionRecord`.
//!
//! Models are told to answer with bare JSON but often wrap it in a fenced code
//! block or surround it with prose. The completion is cleaned, the outermost
//! `{ ... }` span is parsed, and every field is read leniently with defaults.

use chrono::FixedOffset;
use log::debug;
use serde_json::{Map, Value};

use crate::error::ExtractionError;
use crate::ledger::models::{
    Item, PaymentMethod, TransactionRecord, TransactionType, IMAGE_PLACEHOLDER,
};
use crate::utils::{parse_amount, Timestamps, TIMESTAMP_FORMAT};

/// 去掉开头的 ```json / ``` 和结尾的 ```
pub fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        text = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

/// First `{` through last `}`, inclusive.
pub fn slice_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

pub fn parse_completion(raw: &str) -> Result<Map<String, Value>, ExtractionError> {
    let cleaned = strip_fences(raw);

    let slice = slice_object(cleaned)
        .ok_or_else(|| ExtractionError::malformed("no JSON object in response", raw))?;

    match serde_json::from_str::<Value>(slice) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ExtractionError::malformed(
            format!("expected a JSON object, got {other}"),
            raw,
        )),
        Err(e) => Err(ExtractionError::malformed(format!("invalid JSON: {e}"), raw)),
    }
}

/// What the caller knew about the message before asking the model.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionContext<'a> {
    pub text: Option<&'a str>,
    pub fallback_timestamp: &'a str,
    pub offset: FixedOffset,
}

fn string_field<'m>(map: &'m Map<String, Value>, keys: &[&str]) -> Option<&'m str> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s).map(|v| v as f64),
        _ => None,
    }
}

fn number_field(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find_map(number_value)
}

fn parse_items(map: &Map<String, Value>) -> Vec<Item> {
    let Some(Value::Array(values)) = map.get("items") else {
        return Vec::new();
    };

    values
        .iter()
        .filter_map(Value::as_object)
        .map(|item| {
            let quantity = number_field(item, &["quantity", "qty"])
                .filter(|q| *q >= 1.0)
                .map(|q| q.round() as u32)
                .unwrap_or(1);
            let unit_price = number_field(item, &["unit_price", "price"])
                .map(f64::abs)
                .unwrap_or(0.0);
            Item {
                name: string_field(item, &["name"]).unwrap_or("item").to_string(),
                quantity,
                unit_price,
            }
        })
        .collect()
}

pub fn record_from_json(map: &Map<String, Value>, ctx: ExtractionContext<'_>) -> TransactionRecord {
    // 模型给出的时间只有在能解析时才采用，否则使用消息自身的时间
    let timestamp = string_field(map, &["timestamp"])
        .and_then(|ts| Timestamps::parse(ts, ctx.offset))
        .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| ctx.fallback_timestamp.to_string());

    let source_text = string_field(map, &["source_text", "prompt_text"])
        .or(ctx.text)
        .unwrap_or(IMAGE_PLACEHOLDER)
        .to_string();

    let amount = number_field(map, &["amount", "total"])
        .map(f64::abs)
        .unwrap_or(0.0);

    let kind = string_field(map, &["type"])
        .and_then(TransactionType::parse)
        .unwrap_or(TransactionType::Expense);

    let category = string_field(map, &["category"])
        .map(str::to_lowercase)
        .unwrap_or_else(|| "other".to_string());

    let payment_method = string_field(map, &["payment_method"])
        .map(PaymentMethod::parse)
        .unwrap_or(PaymentMethod::Other);

    let summary = string_field(map, &["summary", "description", "summary_text"])
        .unwrap_or(source_text.as_str())
        .to_string();

    let record = TransactionRecord {
        timestamp,
        source_text,
        amount,
        kind,
        category,
        payment_method,
        summary,
        items: parse_items(map),
    };
    debug!("Normalized record: {:?}", record);
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(text: Option<&'a str>) -> ExtractionContext<'a> {
        ExtractionContext {
            text,
            fallback_timestamp: "2025-03-01 12:00:00",
            offset: Timestamps::offset(7),
        }
    }

    #[test]
    fn test_fenced_response() {
        let raw = "```json\n{\"amount\":15000,\"type\":\"expense\",\"category\":\"food\"}\n```";
        let map = parse_completion(raw).unwrap();
        let expected: Value =
            serde_json::json!({"amount": 15000, "type": "expense", "category": "food"});
        assert_eq!(Value::Object(map), expected);
    }

    #[test]
    fn test_prose_around_object() {
        let raw = "Here you go: {\"amount\": 20000, \"summary\": \"Bensin\"} thanks!";
        let map = parse_completion(raw).unwrap();
        assert_eq!(map.get("amount"), Some(&serde_json::json!(20000)));
        assert_eq!(map.get("summary"), Some(&serde_json::json!("Bensin")));
    }

    #[test]
    fn test_fence_after_prose() {
        let raw = "Sure!\n```json\n{\"amount\": 1}\n```\nLet me know.";
        assert!(parse_completion(raw).is_ok());
    }

    #[test]
    fn test_malformed_responses() {
        for raw in ["no json here", "} backwards {", "```json\n{\"amount\": }\n```", "{[1,2]}"] {
            let err = parse_completion(raw).unwrap_err();
            match err {
                ExtractionError::MalformedResponse { raw: kept, .. } => assert_eq!(kept, raw),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_defaults_when_fields_missing() {
        let map = parse_completion("{}").unwrap();
        let record = record_from_json(&map, ctx(None));

        assert_eq!(record.timestamp, "2025-03-01 12:00:00");
        assert_eq!(record.source_text, "image");
        assert_eq!(record.amount, 0.0);
        assert_eq!(record.kind, TransactionType::Expense);
        assert_eq!(record.category, "other");
        assert_eq!(record.payment_method, PaymentMethod::Other);
        assert!(record.items.is_empty());
    }

    #[test]
    fn test_lenient_field_values() {
        let map = parse_completion(
            r#"{
                "timestamp": "",
                "prompt_text": "struk indomaret",
                "amount": "Rp 52.500",
                "type": "Expense",
                "category": "Grocery",
                "payment_method": "OVO",
                "description": "Belanja Indomaret",
                "items": [
                    {"name": "Indomie", "quantity": "5", "price": "3.500"},
                    {"name": "Susu", "quantity": 0, "price": -17000}
                ]
            }"#,
        )
        .unwrap();
        let record = record_from_json(&map, ctx(Some("ignored when prompt_text exists")));

        assert_eq!(record.timestamp, "2025-03-01 12:00:00");
        assert_eq!(record.source_text, "struk indomaret");
        assert_eq!(record.amount, 52500.0);
        assert_eq!(record.category, "grocery");
        assert_eq!(record.payment_method, PaymentMethod::EWallet);
        assert_eq!(record.summary, "Belanja Indomaret");
        assert_eq!(record.items.len(), 2);
        assert_eq!(record.items[0].quantity, 5);
        assert_eq!(record.items[0].unit_price, 3500.0);
        assert_eq!(record.items[1].quantity, 1);
        assert_eq!(record.items[1].unit_price, 17000.0);
    }

    #[test]
    fn test_model_timestamp_is_normalized_or_replaced() {
        let map = parse_completion(r#"{"timestamp": "2025-02-28T08:15:00"}"#).unwrap();
        assert_eq!(record_from_json(&map, ctx(None)).timestamp, "2025-02-28 08:15:00");

        let map = parse_completion(r#"{"timestamp": "kemarin sore"}"#).unwrap();
        assert_eq!(record_from_json(&map, ctx(None)).timestamp, "2025-03-01 12:00:00");
    }

    #[test]
    fn test_negative_amount_and_transfer_type() {
        let map =
            parse_completion(r#"{"amount": -250000, "type": "internal transfer"}"#).unwrap();
        let record = record_from_json(&map, ctx(Some("tf ke tabungan 250rb")));
        assert_eq!(record.amount, 250000.0);
        assert_eq!(record.kind, TransactionType::Transfer);
        assert_eq!(record.source_text, "tf ke tabungan 250rb");
        assert_eq!(record.summary, "tf ke tabungan 250rb");
    }
}
