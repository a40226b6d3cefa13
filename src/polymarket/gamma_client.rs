use std::collections::HashMap;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Outcome;

const GAMMA_API_BASE: &str = "https://gamma-api.polymarket.com";

#[derive(Debug, Error)]
pub enum GammaClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GammaMarket {
    #[serde(alias = "conditionId")]
    pub condition_id: String,
    pub question: String,
    #[serde(default)]
    pub slug: Option<String>,
    /// JSON array of outcome labels, e.g. ["Yes","No"]
    #[serde(default)]
    pub outcomes: Option<String>,
    /// Stringified JSON array of token IDs, e.g. "[\"token1\", \"token2\"]"
    #[serde(default, alias = "clobTokenIds")]
    pub clob_token_ids: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
    #[serde(default, alias = "endDateIso")]
    pub end_date_iso: Option<String>,
}

impl GammaMarket {
    /// Parse the stringified clobTokenIds into a Vec of token ID strings.
    pub fn parse_token_ids(&self) -> Vec<String> {
        self.clob_token_ids
            .as_deref()
            .and_then(|s| serde_json::from_str::<Vec<String>>(s).ok())
            .unwrap_or_default()
    }

    /// Parse the stringified outcomes array into labels.
    pub fn parse_outcome_labels(&self) -> Vec<String> {
        self.outcomes
            .as_deref()
            .and_then(|s| serde_json::from_str::<Vec<String>>(s).ok())
            .unwrap_or_default()
    }

    /// Map each outcome token to its YES/NO leg. Labels are matched by name;
    /// for a two-token market with non-YES/NO labels ("Trump"/"Harris") the
    /// venue convention is first token = YES leg, and we fall back to it.
    pub fn token_outcomes(&self) -> HashMap<String, Outcome> {
        let tokens = self.parse_token_ids();
        let labels = self.parse_outcome_labels();

        let mut map = HashMap::new();
        for (i, token) in tokens.iter().enumerate() {
            let outcome = labels.get(i).and_then(|l| Outcome::from_label(l));
            if let Some(outcome) = outcome {
                map.insert(token.clone(), outcome);
            }
        }
        if map.is_empty() && tokens.len() == 2 {
            map.insert(tokens[0].clone(), Outcome::Yes);
            map.insert(tokens[1].clone(), Outcome::No);
        }
        map
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone)]
pub struct GammaClient {
    http: Client,
    base_url: String,
}

impl GammaClient {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            base_url: GAMMA_API_BASE.into(),
        }
    }

    pub fn with_base_url(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Fetch one market by condition id. The endpoint answers list-shaped.
    pub async fn get_market(
        &self,
        condition_id: &str,
    ) -> Result<Option<GammaMarket>, GammaClientError> {
        let url = format!("{}/markets", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("condition_ids", condition_id)])
            .send()
            .await?
            .error_for_status()?;

        let mut markets: Vec<GammaMarket> = resp.json().await?;
        if markets.is_empty() {
            return Ok(None);
        }
        Ok(Some(markets.remove(0)))
    }
}
