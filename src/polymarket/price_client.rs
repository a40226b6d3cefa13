use chrono::{DateTime, Utc};
use reqwest::Client;
use thiserror::Error;

use crate::models::PricePoint;

use super::types::ApiPriceHistory;

const CLOB_API_BASE: &str = "https://clob.polymarket.com";

#[derive(Debug, Error)]
pub enum PriceClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

#[derive(Debug, Clone)]
pub struct PriceClient {
    http: Client,
    base_url: String,
}

impl PriceClient {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            base_url: CLOB_API_BASE.into(),
        }
    }

    pub fn with_base_url(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Price series for one outcome token over `[start, end]`, oldest first.
    pub async fn get_price_history(
        &self,
        token_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, PriceClientError> {
        let url = format!("{}/prices-history", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("market", token_id),
                ("startTs", &start.timestamp().to_string()),
                ("endTs", &end.timestamp().to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let history: ApiPriceHistory = resp.json().await?;
        Ok(history.into_series())
    }
}
