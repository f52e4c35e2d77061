//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SEARCHSYNC_*)
//! 2. TOML config file (if SEARCHSYNC_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize};

mod validation;

pub use validation::ConfigError;

/// How the server exposes its source registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerTransport {
    /// Plain request/response endpoint at `/_search-source`.
    #[default]
    Http,
    /// Persistent JSON-RPC connection over stdio.
    Stdio,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SEARCHSYNC_*)
/// 2. TOML config file (if SEARCHSYNC_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the remote search endpoint.
    ///
    /// Set via SEARCHSYNC_ENDPOINT environment variable.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SEARCHSYNC_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Transport-level request timeout in milliseconds. Unset means none.
    ///
    /// Set via SEARCHSYNC_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// How long a history entry may be reused, in milliseconds.
    /// Unset disables history keeping altogether.
    ///
    /// Set via SEARCHSYNC_KEEP_HISTORY_MS environment variable.
    #[serde(default)]
    pub keep_history_ms: Option<u64>,

    /// Whether to client-filter stale rows while a request is in flight.
    ///
    /// Set via SEARCHSYNC_LOCAL_SEARCH environment variable.
    #[serde(default)]
    pub local_search: bool,

    /// Address the server binds its HTTP endpoint to.
    ///
    /// Set via SEARCHSYNC_BIND_ADDR environment variable.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server transport (`http` or `stdio`).
    ///
    /// Set via SEARCHSYNC_TRANSPORT environment variable.
    #[serde(default)]
    pub transport: ServerTransport,

    /// JSON file of documents served by the built-in corpus source.
    ///
    /// Set via SEARCHSYNC_CORPUS_PATH environment variable.
    #[serde(default)]
    pub corpus_path: Option<PathBuf>,

    /// Source name the corpus is registered under.
    ///
    /// Set via SEARCHSYNC_CORPUS_SOURCE environment variable.
    #[serde(default = "default_corpus_source")]
    pub corpus_source: String,

    /// Fields the corpus source matches query terms against.
    ///
    /// Set via SEARCHSYNC_CORPUS_FIELDS environment variable (comma-separated).
    #[serde(default = "default_corpus_fields", deserialize_with = "deserialize_fields")]
    pub corpus_fields: Vec<String>,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:3700".into()
}

fn default_user_agent() -> String {
    "searchsync/0.1".into()
}

fn default_bind_addr() -> String {
    "127.0.0.1:3700".into()
}

fn default_corpus_source() -> String {
    "corpus".into()
}

fn default_corpus_fields() -> Vec<String> {
    vec!["title".into(), "body".into()]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            user_agent: default_user_agent(),
            timeout_ms: None,
            keep_history_ms: None,
            local_search: false,
            bind_addr: default_bind_addr(),
            transport: ServerTransport::Http,
            corpus_path: None,
            corpus_source: default_corpus_source(),
            corpus_fields: default_corpus_fields(),
        }
    }
}

impl AppConfig {
    /// Transport timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// History TTL, or `None` when history keeping is disabled.
    pub fn keep_history(&self) -> Option<Duration> {
        self.keep_history_ms.map(Duration::from_millis)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SEARCHSYNC_`
    /// 2. TOML file from `SEARCHSYNC_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SEARCHSYNC_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SEARCHSYNC_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Corpus path, required only when the corpus source is enabled.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no corpus path is configured.
    pub fn require_corpus_path(&self) -> Result<&PathBuf, ConfigError> {
        self.corpus_path.as_ref().ok_or_else(|| ConfigError::Missing {
            field: "corpus_path".into(),
            hint: "Set SEARCHSYNC_CORPUS_PATH environment variable".into(),
        })
    }
}

/// Accept either a list or a comma-separated string (as produced by env vars).
fn deserialize_fields<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Fields {
        Joined(String),
        List(Vec<String>),
    }

    let raw = match Fields::deserialize(deserializer)? {
        Fields::Joined(joined) => vec![joined],
        Fields::List(list) => list,
    };
    Ok(split_fields(&raw))
}

fn split_fields(fields: &[String]) -> Vec<String> {
    fields
        .iter()
        .flat_map(|f| f.split(','))
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(String::from)
        .collect()
}
