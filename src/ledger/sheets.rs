use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LedgerError;
use crate::ledger::models::LEDGER_HEADER;
use crate::ledger::store::SheetBackend;

const SHEETS_API_URL: &str = "https://sheets.googleapis.com";

/// Google Sheets v4 backend. Reads the whole tab and appends with
/// `valueInputOption=RAW` so amounts and timestamps are stored verbatim.
pub struct GoogleSheet {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    tab: String,
    access_token: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Serialize)]
struct AppendBody {
    values: Vec<Vec<String>>,
}

fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl GoogleSheet {
    pub fn new(
        spreadsheet_id: String,
        tab: String,
        access_token: String,
        timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: SHEETS_API_URL.to_string(),
            spreadsheet_id,
            tab,
            access_token,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn range(&self) -> String {
        let last_column = (b'A' + LEDGER_HEADER.len() as u8 - 1) as char;
        format!("{}!A:{}", self.tab, last_column)
    }

    fn values_url(&self, suffix: &str) -> Result<Url, LedgerError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| LedgerError::backend(format!("invalid Sheets URL: {e}")))?;
        let range = format!("{}{}", self.range(), suffix);
        url.path_segments_mut()
            .map_err(|_| LedgerError::backend("Sheets URL cannot be a base"))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                range.as_str(),
            ]);
        Ok(url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, LedgerError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(LedgerError::backend(format!("Sheets API error {status}: {body}")))
    }
}

#[async_trait]
impl SheetBackend for GoogleSheet {
    async fn rows(&self) -> Result<Vec<Vec<String>>, LedgerError> {
        let url = self.values_url("")?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let range: ValueRange = Self::check(response).await?.json().await?;
        debug!("Fetched {} rows from Google Sheets", range.values.len());

        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn append_row(&self, cells: Vec<String>) -> Result<(), LedgerError> {
        let url = self.values_url(":append")?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&AppendBody {
                values: vec![cells],
            })
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "google_sheets"
    }
}
