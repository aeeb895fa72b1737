//! Google Sheets v4 REST client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mailtrack_core::{Error, Identity, Result};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};

use super::RowStore;
use crate::layout::{column_range, quote_tab, CellRef, CellUpdate, Column};
use crate::token::TokenSource;

const VALUE_INPUT_OPTION: &str = "USER_ENTERED";

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateRequest<'a> {
    value_input_option: &'a str,
    data: Vec<RangeData>,
}

#[derive(Debug, Serialize)]
struct RangeData {
    range: String,
    values: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct AppendRequest {
    values: Vec<Vec<String>>,
}

/// [`RowStore`] over the Sheets REST API, one tab of one document.
pub struct SheetsClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
    base: Url,
    sheet_id: String,
    tab: String,
    identity_column: Column,
}

impl SheetsClient {
    /// Create a client for `tab` of document `sheet_id` under `api_base`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `api_base` is not an absolute URL.
    pub fn new(
        http: reqwest::Client,
        tokens: Arc<dyn TokenSource>,
        api_base: &str,
        sheet_id: impl Into<String>,
        tab: impl Into<String>,
        identity_column: Column,
    ) -> Result<Self> {
        let base = Url::parse(api_base)
            .map_err(|e| Error::Validation(format!("sheets api base {api_base:?}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::Validation(format!(
                "sheets api base {api_base:?} cannot carry a path"
            )));
        }
        Ok(Self {
            http,
            tokens,
            base,
            sheet_id: sheet_id.into(),
            tab: tab.into(),
            identity_column,
        })
    }

    fn url(&self, tail: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&self.sheet_id).extend(tail);
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.tokens.access_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::transport(None, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.tokens.invalidate().await;
            return Err(Error::auth(Some(status.as_u16()), body));
        }
        Err(Error::transport(Some(status.as_u16()), body))
    }

    async fn get_values(&self, range: &str) -> Result<ValueRange> {
        let response = self.send(self.http.get(self.url(&["values", range]))).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::transport(None, e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn cell_text(value: &serde_json::Value) -> Option<String> {
    let text = match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => return None,
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

#[async_trait]
impl RowStore for SheetsClient {
    async fn find_row(&self, identity: &Identity) -> Result<Option<u32>> {
        let range = column_range(&self.tab, self.identity_column);
        let column = self.get_values(&range).await?;

        let position = column.values.iter().position(|row| {
            row.first()
                .and_then(cell_text)
                .is_some_and(|cell| identity.matches(&cell))
        });
        tracing::debug!(
            rows = column.values.len(),
            found = position.is_some(),
            "scanned identity column"
        );
        Ok(position.map(|i| i as u32 + 1))
    }

    async fn read_cell(&self, cell: &CellRef) -> Result<Option<String>> {
        let range = self.get_values(&cell.a1(&self.tab)).await?;
        Ok(range
            .values
            .first()
            .and_then(|row| row.first())
            .and_then(cell_text))
    }

    async fn batch_write(&self, updates: &[CellUpdate], timeout: Duration) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let body = BatchUpdateRequest {
            value_input_option: VALUE_INPUT_OPTION,
            data: updates
                .iter()
                .map(|u| RangeData {
                    range: u.cell.a1(&self.tab),
                    values: vec![vec![u.value.clone()]],
                })
                .collect(),
        };
        let request = self
            .http
            .post(self.url(&["values:batchUpdate"]))
            .json(&body);

        tokio::time::timeout(timeout, self.send(request))
            .await
            .map_err(|_| Error::Timeout(timeout))??;
        Ok(())
    }

    async fn append_row(&self, values: Vec<String>) -> Result<()> {
        let target = format!("{}:append", quote_tab(&self.tab));
        let mut url = self.url(&["values", &target]);
        url.query_pairs_mut()
            .append_pair("valueInputOption", VALUE_INPUT_OPTION)
            .append_pair("insertDataOption", "INSERT_ROWS");

        let request = self.http.post(url).json(&AppendRequest {
            values: vec![values],
        });
        self.send(request).await?;
        Ok(())
    }
}
