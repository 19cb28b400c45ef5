// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic JSON REST provider
//!
//! Drives the common exchange shape: a form login that yields a session
//! token, then a market query whose response is mapped into [`Market`]
//! values through configured dot-separated field paths. Exchange-specific
//! knowledge lives entirely in [`RestProviderConfig`].

use async_trait::async_trait;
use ovr_core::{Market, Outcome};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;

use super::{AdapterError, ProviderAdapter};

// Wrapper keys probed when no explicit markets_key is configured.
const COMMON_WRAPPER_KEYS: &[&str] = &["result", "results", "data", "items", "markets"];

fn default_session_header() -> String {
    "X-Authentication".to_string()
}

fn default_token_key() -> String {
    "sessionToken".to_string()
}

/// Dot-separated paths into each raw market object.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldPaths {
    pub market_id: String,
    pub market_name: String,
    pub event_name: String,
    /// Path to the list of raw outcome objects within a market item.
    pub outcomes: String,
    /// Paths within each raw outcome object.
    pub outcome_name: String,
    pub outcome_odds: String,
}

/// Configuration for one [`RestProvider`].
#[derive(Debug, Clone, Deserialize)]
pub struct RestProviderConfig {
    pub name: String,
    pub login_url: String,
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Sent as `X-Application` on login and queries when present.
    #[serde(default)]
    pub app_key: Option<String>,
    /// Header carrying the session token on queries.
    #[serde(default = "default_session_header")]
    pub session_header: String,
    /// Dot-path to the session token in the login response.
    #[serde(default = "default_token_key")]
    pub session_token_key: String,
    /// Dot-path to the market list in the query response. When absent the
    /// body itself, or a handful of common wrapper keys, is probed.
    #[serde(default)]
    pub markets_key: Option<String>,
    pub field_paths: FieldPaths,
}

/// A provider adapter speaking plain JSON-over-HTTP.
#[derive(Debug)]
pub struct RestProvider {
    config: RestProviderConfig,
    client: reqwest::Client,
    session_token: Mutex<Option<String>>,
}

impl RestProvider {
    pub fn new(config: RestProviderConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            session_token: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ProviderAdapter for RestProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn authenticate(&self) -> Result<bool, AdapterError> {
        let mut request = self.client.post(&self.config.login_url).form(&[
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ]);
        if let Some(app_key) = &self.config.app_key {
            request = request.header("X-Application", app_key);
        }

        let body: Value = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match lookup(&body, &self.config.session_token_key).and_then(Value::as_str) {
            Some(token) if !token.is_empty() => {
                *self.session_token.lock() = Some(token.to_string());
                tracing::info!(source = %self.config.name, "session established");
                Ok(true)
            }
            _ => {
                tracing::warn!(source = %self.config.name, "login response carried no session token");
                Ok(false)
            }
        }
    }

    fn is_authenticated(&self) -> bool {
        self.session_token.lock().is_some()
    }

    async fn get_snapshot(&self, selectors: &[String]) -> Result<Vec<Market>, AdapterError> {
        let token = self
            .session_token
            .lock()
            .clone()
            .ok_or(AdapterError::NotAuthenticated)?;

        let mut request = self
            .client
            .post(&self.config.base_url)
            .header(self.config.session_header.as_str(), token)
            .json(&serde_json::json!({ "event_type_ids": selectors }));
        if let Some(app_key) = &self.config.app_key {
            request = request.header("X-Application", app_key);
        }

        let body: Value = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(parse_markets(&self.config, &body))
    }
}

/// Map a query response body into markets, skipping malformed items.
fn parse_markets(config: &RestProviderConfig, body: &Value) -> Vec<Market> {
    let Some(items) = unwrap_items(body, config.markets_key.as_deref()) else {
        tracing::warn!(source = %config.name, "query response carried no market list");
        return Vec::new();
    };

    let mut markets = Vec::new();
    for item in items {
        match map_market(config, item) {
            // Markets without a priced outcome are useless downstream.
            Some(market) if !market.outcomes.is_empty() => markets.push(market),
            Some(_) => {}
            None => {
                tracing::warn!(source = %config.name, "skipping malformed market item");
            }
        }
    }
    tracing::debug!(source = %config.name, count = markets.len(), "parsed markets");
    markets
}

fn unwrap_items<'a>(body: &'a Value, markets_key: Option<&str>) -> Option<&'a Vec<Value>> {
    if let Some(key) = markets_key {
        return lookup(body, key)?.as_array();
    }
    if let Some(items) = body.as_array() {
        return Some(items);
    }
    COMMON_WRAPPER_KEYS
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_array))
}

fn map_market(config: &RestProviderConfig, item: &Value) -> Option<Market> {
    let paths = &config.field_paths;
    let mut market = Market::new(
        as_display(lookup(item, &paths.market_id)?)?,
        as_display(lookup(item, &paths.market_name)?)?,
        as_display(lookup(item, &paths.event_name)?)?,
        &config.name,
    );

    if let Some(raw_outcomes) = lookup(item, &paths.outcomes).and_then(Value::as_array) {
        for raw in raw_outcomes {
            let name = lookup(raw, &paths.outcome_name).and_then(|v| as_display(v));
            let odds = lookup(raw, &paths.outcome_odds).and_then(Value::as_f64);
            if let (Some(name), Some(odds)) = (name, odds) {
                market.outcomes.push(Outcome::new(name, odds, &config.name));
            }
        }
    }

    Some(market)
}

// Dot-notation descent, e.g. "event.name".
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for part in path.split('.') {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

// Ids sometimes arrive as numbers; render either form as a string.
fn as_display(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "rest_tests.rs"]
mod tests;
