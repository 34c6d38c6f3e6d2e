//! Runtime configuration shared by client apps.
//!
//! Raw values come from wherever the embedding app keeps them (the CLI reads
//! a profiles file plus environment overrides). This module only validates
//! and normalizes them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::remote::{normalize_rest_url, RemoteResult, SupabaseRecordStore};
use crate::util::normalize_text_option;

/// Default autosave period
pub const DEFAULT_AUTOSAVE_INTERVAL_MS: u64 = 3_000;
/// Shortest autosave period accepted
pub const MIN_AUTOSAVE_INTERVAL_MS: u64 = 250;

/// Validated settings for the hosted record store.
///
/// The access token comes from an external auth flow and is never written
/// back to disk by this crate.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub supabase_url: String,
    pub anon_key: String,
    pub access_token: String,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RemoteConfig")
            .field("supabase_url", &self.supabase_url)
            .field("anon_key", &"[REDACTED]")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

impl RemoteConfig {
    /// Build from optional parts.
    ///
    /// Returns `Ok(None)` when nothing is configured and an error when only
    /// some of the values are present.
    pub fn resolve(
        supabase_url: Option<String>,
        anon_key: Option<String>,
        access_token: Option<String>,
    ) -> Result<Option<Self>, String> {
        let supabase_url = normalize_text_option(supabase_url);
        let anon_key = normalize_text_option(anon_key);
        let access_token = normalize_text_option(access_token);

        match (supabase_url, anon_key, access_token) {
            (None, None, None) => Ok(None),
            (Some(url), Some(anon_key), Some(access_token)) => {
                normalize_rest_url(&url).map_err(|error| error.to_string())?;
                Ok(Some(Self {
                    supabase_url: url.trim_end_matches('/').to_string(),
                    anon_key,
                    access_token,
                }))
            }
            (url, anon_key, access_token) => {
                let missing = [
                    ("supabase_url", url.is_none()),
                    ("supabase_anon_key", anon_key.is_none()),
                    ("access token", access_token.is_none()),
                ]
                .into_iter()
                .filter_map(|(field, missing)| missing.then_some(field))
                .collect::<Vec<_>>();
                Err(format!(
                    "remote configuration is incomplete; missing {}",
                    missing.join(", ")
                ))
            }
        }
    }

    /// Build the HTTP record store for these settings
    pub fn connect(&self) -> RemoteResult<SupabaseRecordStore> {
        SupabaseRecordStore::new(&self.supabase_url, &self.anon_key, &self.access_token)
    }
}

/// Autosave timer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveConfig {
    pub interval: Duration,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_AUTOSAVE_INTERVAL_MS),
        }
    }
}

impl AutosaveConfig {
    /// Use the default period when unset; reject periods below the floor.
    pub fn from_millis(interval_ms: Option<u64>) -> Result<Self, String> {
        let Some(interval_ms) = interval_ms else {
            return Ok(Self::default());
        };
        if interval_ms < MIN_AUTOSAVE_INTERVAL_MS {
            return Err(format!(
                "autosave_interval_ms must be at least {MIN_AUTOSAVE_INTERVAL_MS} \
                 (got {interval_ms})"
            ));
        }
        Ok(Self {
            interval: Duration::from_millis(interval_ms),
        })
    }
}
