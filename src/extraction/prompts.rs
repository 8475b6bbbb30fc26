const EXTRACTION_PROMPT: &str = r#"You will receive text and/or an image describing a financial transaction (a chat message, a shopping receipt or a transfer screenshot). Analyse it and answer with ONE valid JSON object in exactly this shape:

{
  "prompt_text": "the given text, or a short description of the image",
  "category": "one of: food, grocery, transport, fuel, utility, health, entertainment, education, gift, salary, transfer, other",
  "amount": 0,
  "payment_method": "one of: cash, bank, e-wallet, other",
  "type": "one of: expense, income, transfer",
  "summary": "short human readable summary of the transaction",
  "items": [
    {"name": "item name", "quantity": 1, "price": 0}
  ]
}

Rules:
1. Return ONLY the JSON object, without explanation and without markdown.
2. "amount" is the total as a plain number in Indonesian Rupiah (50000, not "Rp 50.000").
3. Bank names and cards (BCA, BNI, BRI, Mandiri, debit) are "bank"; GoPay, OVO, DANA, ShopeePay and LinkAja are "e-wallet".
4. Fill "items" only when there is an explicit list of purchases, such as a receipt.
5. "expense" is money going out, "income" is money coming in, "transfer" moves money between own accounts.
6. When some information is missing use a sensible default.

Analyse the following data:"#;

const ADVICE_PROMPT: &str = "You are a personal finance assistant. Below is the aggregated list of this week's transactions as CSV (amounts in Indonesian Rupiah). Write short, concrete advice for the coming week: where the money went, what stands out and what could be reduced.";

pub fn extraction_prompt(text: Option<&str>, has_image: bool) -> String {
    let mut prompt = EXTRACTION_PROMPT.to_string();
    if let Some(text) = text {
        prompt.push_str("\n\nText: ");
        prompt.push_str(text);
    }
    if has_image {
        prompt.push_str("\n\nImage: [attached]");
    }
    prompt
}

pub fn advice_prompt(csv: &str) -> String {
    format!("{ADVICE_PROMPT}\n\n{csv}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_prompt_parts() {
        let text_only = extraction_prompt(Some("beli nasi padang 15000 cash"), false);
        assert!(text_only.ends_with("Text: beli nasi padang 15000 cash"));
        assert!(!text_only.contains("[attached]"));

        let both = extraction_prompt(Some("makan siang"), true);
        assert!(both.contains("Text: makan siang\n\nImage: [attached]"));

        let image_only = extraction_prompt(None, true);
        assert!(!image_only.contains("Text:"));
    }
}
