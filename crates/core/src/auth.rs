// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session state shared between the auth manager and its callers

use std::fmt;

use serde::{Deserialize, Serialize};

/// Per-source session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    Pending,
    Success,
    Failed,
    /// Authenticated before, but the session has since aged out.
    Expired,
}

/// Outcome of the most recent authentication attempt for one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResult {
    pub source: String,
    pub status: AuthStatus,
    /// Epoch ms of the last successful authentication.
    /// Set only on the transition into `Success`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticated_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthResult {
    pub fn pending(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            status: AuthStatus::Pending,
            authenticated_at: None,
            error: None,
        }
    }

    pub fn success(source: impl Into<String>, authenticated_at: u64) -> Self {
        Self {
            source: source.into(),
            status: AuthStatus::Success,
            authenticated_at: Some(authenticated_at),
            error: None,
        }
    }

    pub fn failed(source: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            status: AuthStatus::Failed,
            authenticated_at: None,
            error: Some(error.into()),
        }
    }

    /// Expiry keeps the original authentication timestamp.
    pub fn expired(source: impl Into<String>, authenticated_at: Option<u64>) -> Self {
        Self {
            source: source.into(),
            status: AuthStatus::Expired,
            authenticated_at,
            error: None,
        }
    }

    /// True when the session is usable, ignoring wall-clock expiry.
    pub fn ok(&self) -> bool {
        self.status == AuthStatus::Success
    }

    /// Milliseconds since the last successful authentication.
    pub fn age_ms(&self, now_ms: u64) -> Option<u64> {
        self.authenticated_at
            .map(|at| now_ms.saturating_sub(at))
    }

    /// True when the session is older than `ttl_ms` at `now_ms`.
    pub fn is_stale(&self, ttl_ms: u64, now_ms: u64) -> bool {
        match self.authenticated_at {
            Some(at) => now_ms.saturating_sub(at) >= ttl_ms,
            None => false,
        }
    }
}

impl fmt::Display for AuthResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            AuthStatus::Success => write!(f, "[{}] OK", self.source),
            AuthStatus::Expired => write!(f, "[{}] EXPIRED", self.source),
            AuthStatus::Pending => write!(f, "[{}] PENDING", self.source),
            AuthStatus::Failed => write!(
                f,
                "[{}] FAILED error={:?}",
                self.source,
                self.error.as_deref().unwrap_or("unknown")
            ),
        }
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
