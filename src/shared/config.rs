//! Application configuration. Telegram client bootstrap plus the tunables
//! the core components expose (spec.md §6).
//!
//! Grounded on the teacher's `AppConfig::load` (`config` crate layered over
//! `dotenv`, with a typed prefix plus a few bare env vars read directly),
//! generalized from the sync app's delay/queue knobs to this server's
//! page-size/export/wait-budget knobs.

use std::time::Duration;

use serde::Deserialize;

use crate::core::{FetcherConfig, WaitConfig};

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub api_id: Option<i32>,
    pub api_hash: Option<String>,
    pub data_dir: Option<String>,
    pub session_path: Option<String>,

    /// Max messages returned inline per page before falling back to export
    /// (spec.md §6). Read from MAX_PAGE_SIZE.
    #[serde(default)]
    pub max_page_size: Option<u32>,
    /// Inline/export threshold (spec.md §4.F). Read from EXPORT_THRESHOLD.
    #[serde(default)]
    pub export_threshold: Option<usize>,
    /// Hours an export artifact stays readable before `RESOURCE_EXPIRED`.
    /// Read from ARTIFACT_TTL_HOURS.
    #[serde(default)]
    pub artifact_ttl_hours: Option<u64>,
    /// Seconds the Wait Controller will sleep out a FloodWait before
    /// surfacing a resumable `RATE_LIMITED`. Read from WAIT_BUDGET_SECONDS.
    #[serde(default)]
    pub wait_budget_seconds: Option<u64>,
    /// Bounded retries for transient gateway errors. Read from
    /// MAX_RETRY_ATTEMPTS.
    #[serde(default)]
    pub max_retry_attempts: Option<u32>,
    /// Per-request timeout budget. Read from REQUEST_TIMEOUT_SECONDS.
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
    /// How many provider reads the Fetcher may issue per requested page, to
    /// absorb a filter/search rejecting most candidates. Read from
    /// INNER_READ_MULTIPLIER.
    #[serde(default)]
    pub inner_read_multiplier: Option<u32>,
    /// Enable the Chat Resolver's bounded LRU cache. Read from
    /// RESOLVER_CACHE_ENABLED.
    #[serde(default)]
    pub resolver_cache_enabled: Option<bool>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("TG_HISTORY"));
        if let Ok(path) = std::env::var("TG_HISTORY_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        let mut cfg: Self = c.build()?.try_deserialize()?;

        // A few knobs are read bare (no TG_HISTORY_ prefix) so a plain .env
        // reads naturally against spec.md §6's option names.
        if let Ok(s) = std::env::var("MAX_PAGE_SIZE") {
            if let Ok(n) = s.parse() {
                cfg.max_page_size = Some(n);
            }
        }
        if let Ok(s) = std::env::var("EXPORT_THRESHOLD") {
            if let Ok(n) = s.parse() {
                cfg.export_threshold = Some(n);
            }
        }
        if let Ok(s) = std::env::var("ARTIFACT_TTL_HOURS") {
            if let Ok(n) = s.parse() {
                cfg.artifact_ttl_hours = Some(n);
            }
        }
        if let Ok(s) = std::env::var("WAIT_BUDGET_SECONDS") {
            if let Ok(n) = s.parse() {
                cfg.wait_budget_seconds = Some(n);
            }
        }
        if let Ok(s) = std::env::var("MAX_RETRY_ATTEMPTS") {
            if let Ok(n) = s.parse() {
                cfg.max_retry_attempts = Some(n);
            }
        }
        if let Ok(s) = std::env::var("REQUEST_TIMEOUT_SECONDS") {
            if let Ok(n) = s.parse() {
                cfg.request_timeout_seconds = Some(n);
            }
        }
        if let Ok(s) = std::env::var("INNER_READ_MULTIPLIER") {
            if let Ok(n) = s.parse() {
                cfg.inner_read_multiplier = Some(n);
            }
        }
        if let Ok(s) = std::env::var("RESOLVER_CACHE_ENABLED") {
            if let Ok(b) = s.parse() {
                cfg.resolver_cache_enabled = Some(b);
            }
        }

        Ok(cfg)
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        let defaults = FetcherConfig::default();
        FetcherConfig {
            max_page_size: self.max_page_size.unwrap_or(defaults.max_page_size),
            export_threshold: self.export_threshold.unwrap_or(defaults.export_threshold),
            inner_read_multiplier: self
                .inner_read_multiplier
                .unwrap_or(defaults.inner_read_multiplier),
            request_timeout_seconds: self
                .request_timeout_seconds
                .unwrap_or(defaults.request_timeout_seconds),
            max_inner_batches: defaults.max_inner_batches,
        }
    }

    pub fn wait_config(&self) -> WaitConfig {
        let defaults = WaitConfig::default();
        WaitConfig {
            wait_budget_seconds: self
                .wait_budget_seconds
                .unwrap_or(defaults.wait_budget_seconds),
            max_attempts: self.max_retry_attempts.unwrap_or(defaults.max_attempts),
            base_backoff_ms: defaults.base_backoff_ms,
            jitter_ratio: defaults.jitter_ratio,
        }
    }

    pub fn artifact_ttl(&self) -> Duration {
        Duration::from_secs(self.artifact_ttl_hours.unwrap_or(24) * 3600)
    }

    pub fn resolver_cache_enabled(&self) -> bool {
        self.resolver_cache_enabled.unwrap_or(false)
    }
}
