// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration loading
//!
//! Pipeline settings come from `overround.toml`; per-source credentials
//! come from `OVR_<SOURCE>_USERNAME` / `OVR_<SOURCE>_PASSWORD` (and
//! optionally `OVR_<SOURCE>_APP_KEY`) environment variables so secrets
//! stay out of the file. Missing config or missing credentials for an
//! enabled source is fatal at startup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ovr_adapters::{FieldPaths, RestProvider, RestProviderConfig};
use ovr_engine::ProviderMap;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("missing environment variable {var} for source {source_name}")]
    MissingCredentials { source_name: String, var: String },
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_sport() -> String {
    "soccer".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_sport")]
    pub sport: String,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub harvest: HarvestSection,
    #[serde(default)]
    pub feed: FeedSection,
    #[serde(default)]
    pub compare: CompareSection,
    #[serde(default, rename = "source")]
    pub sources: BTreeMap<String, SourceSection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub token_ttl_secs: u64,
    pub max_workers: usize,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            token_ttl_secs: 3600,
            max_workers: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestSection {
    pub batch_interval_secs: u64,
}

impl Default for HarvestSection {
    fn default() -> Self {
        Self {
            batch_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedSection {
    pub poll_interval_secs: u64,
    /// Selector ids passed to every adapter (e.g. sport ids).
    pub selectors: Vec<String>,
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            selectors: vec!["1".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompareSection {
    pub max_denominator: u32,
    pub fraction_tolerance: f64,
    pub min_sources: usize,
}

impl Default for CompareSection {
    fn default() -> Self {
        Self {
            max_denominator: 20,
            fraction_tolerance: 0.01,
            min_sources: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceSection {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub login_url: String,
    pub base_url: String,
    #[serde(default)]
    pub session_header: Option<String>,
    #[serde(default)]
    pub session_token_key: Option<String>,
    #[serde(default)]
    pub markets_key: Option<String>,
    pub field_paths: FieldPaths,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.token_ttl_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.feed.poll_interval_secs)
    }

    pub fn batch_interval(&self) -> Duration {
        Duration::from_secs(self.harvest.batch_interval_secs)
    }

    /// Per-source display currencies for the feed manager.
    pub fn currencies(&self) -> std::collections::HashMap<String, String> {
        self.sources
            .iter()
            .map(|(name, source)| (name.clone(), source.currency.clone()))
            .collect()
    }
}

/// One REST provider per enabled source, credentials resolved from the
/// environment.
pub fn build_providers(config: &Config) -> Result<ProviderMap, ConfigError> {
    let mut providers = ProviderMap::new();
    for (name, source) in &config.sources {
        if !source.enabled {
            continue;
        }

        let username = require_env(name, "USERNAME")?;
        let password = require_env(name, "PASSWORD")?;
        let app_key = std::env::var(env_var(name, "APP_KEY")).ok();

        let session_header = source
            .session_header
            .clone()
            .unwrap_or_else(|| "X-Authentication".to_string());
        let session_token_key = source
            .session_token_key
            .clone()
            .unwrap_or_else(|| "sessionToken".to_string());

        let rest = RestProviderConfig {
            name: name.clone(),
            login_url: source.login_url.clone(),
            base_url: source.base_url.clone(),
            username,
            password,
            app_key,
            session_header,
            session_token_key,
            markets_key: source.markets_key.clone(),
            field_paths: source.field_paths.clone(),
        };

        providers.insert(name.clone(), Arc::new(RestProvider::new(rest)));
    }
    Ok(providers)
}

fn env_var(source: &str, suffix: &str) -> String {
    format!("OVR_{}_{suffix}", source.to_uppercase().replace('-', "_"))
}

fn require_env(source: &str, suffix: &str) -> Result<String, ConfigError> {
    let var = env_var(source, suffix);
    std::env::var(&var)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::MissingCredentials {
            source_name: source.to_string(),
            var,
        })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
