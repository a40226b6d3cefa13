use chrono::{DateTime, Utc};
use reqwest::Client;
use reqwest::StatusCode;
use thiserror::Error;

use super::types::{ApiAccountSummary, ApiFill, ApiPosition};

const DATA_API_BASE: &str = "https://data-api.polymarket.com";

/// Largest page the trades endpoint will serve.
pub const MAX_PAGE_SIZE: u32 = 500;

#[derive(Debug, Error)]
pub enum DataClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

#[derive(Debug, Clone)]
pub struct DataClient {
    http: Client,
    base_url: String,
}

impl DataClient {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            base_url: DATA_API_BASE.into(),
        }
    }

    pub fn with_base_url(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// One page of fills for a market, oldest filter bounds expressed as
    /// epoch seconds. `limit` is clamped to the endpoint's maximum.
    pub async fn get_market_fills(
        &self,
        condition_id: &str,
        after: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ApiFill>, DataClientError> {
        self.get_fills(&[("market", condition_id.to_string())], after, before, limit, offset)
            .await
    }

    /// One page of fills where the wallet was maker or taker.
    pub async fn get_wallet_fills(
        &self,
        wallet: &str,
        after: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ApiFill>, DataClientError> {
        self.get_fills(&[("user", wallet.to_string())], after, before, limit, offset)
            .await
    }

    async fn get_fills(
        &self,
        scope: &[(&str, String)],
        after: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ApiFill>, DataClientError> {
        let url = format!("{}/trades", self.base_url);
        let mut query: Vec<(&str, String)> = scope.to_vec();
        query.push(("limit", limit.min(MAX_PAGE_SIZE).to_string()));
        query.push(("offset", offset.to_string()));
        if let Some(after) = after {
            query.push(("after", after.timestamp().to_string()));
        }
        if let Some(before) = before {
            query.push(("before", before.timestamp().to_string()));
        }

        let resp = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?;

        let fills: Vec<ApiFill> = resp.json().await?;
        Ok(fills)
    }

    /// Net outcome-token positions currently held by a wallet.
    pub async fn get_positions(&self, wallet: &str) -> Result<Vec<ApiPosition>, DataClientError> {
        let url = format!("{}/positions", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("user", wallet)])
            .send()
            .await?
            .error_for_status()?;

        let positions: Vec<ApiPosition> = resp.json().await?;
        Ok(positions)
    }

    /// Lifetime account summary. `None` when the venue does not know the
    /// wallet.
    pub async fn get_account_summary(
        &self,
        wallet: &str,
    ) -> Result<Option<ApiAccountSummary>, DataClientError> {
        let url = format!("{}/accounts/{}", self.base_url, wallet);
        let resp = self.http.get(&url).send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = resp.error_for_status()?;
        let summary: ApiAccountSummary = resp.json().await?;
        Ok(Some(summary))
    }
}
