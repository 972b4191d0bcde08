//! Engine configuration.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AUTOLOT_LATENCY_MS` | 0 | Simulated round-trip delay per resolution |
//! | `AUTOLOT_SEED` | true | Load the marketplace fixture rows on start |
//! | `AUTOLOT_SEARCH_FIELDS` | title,make,model | Fields scanned by `or(...)` search |
//! | `AUTOLOT_PLACEHOLDER_URL` | /placeholder.svg | URL handed out by the blob store |

use std::time::Duration;

use serde::Deserialize;

use crate::error::Error;

pub const DEFAULT_PLACEHOLDER_URL: &str = "/placeholder.svg";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub latency_ms: u64,
    pub seed: bool,
    pub search_fields: Vec<String>,
    pub placeholder_url: String,
    pub channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            latency_ms: 0,
            seed: true,
            search_fields: vec!["title".into(), "make".into(), "model".into()],
            placeholder_url: DEFAULT_PLACEHOLDER_URL.to_string(),
            channel_capacity: 64,
        }
    }
}

impl Config {
    /// Empty store, no delay.
    pub fn bare() -> Self {
        Self {
            seed: false,
            ..Default::default()
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, Error> {
        serde_json::from_str(raw).map_err(|e| Error::Deserialize(e.to_string()))
    }

    /// Defaults overridden by any `AUTOLOT_*` variables that are set.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::default();

        if let Some(raw) = lookup("AUTOLOT_LATENCY_MS") {
            config.latency_ms = raw.trim().parse().map_err(|_| {
                Error::Validation(format!("AUTOLOT_LATENCY_MS is not a number: {}", raw))
            })?;
        }
        if let Some(raw) = lookup("AUTOLOT_SEED") {
            config.seed = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(Error::Validation(format!(
                        "AUTOLOT_SEED is not a boolean: {}",
                        other
                    )));
                }
            };
        }
        if let Some(raw) = lookup("AUTOLOT_SEARCH_FIELDS") {
            config.search_fields = raw
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(raw) = lookup("AUTOLOT_PLACEHOLDER_URL") {
            config.placeholder_url = raw;
        }

        Ok(config)
    }

    pub fn latency(&self) -> Option<Duration> {
        (self.latency_ms > 0).then(|| Duration::from_millis(self.latency_ms))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency_ms = latency.as_millis() as u64;
        self
    }

    pub fn with_seed(mut self, seed: bool) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_placeholder_url(mut self, url: impl Into<String>) -> Self {
        self.placeholder_url = url.into();
        self
    }
}
