//! Application configuration loaded from a JSON file.
//!
//! Only `query.research_field` is mandatory; every other value has a default.
//! Credentials may come from the file or, at the composition root, from the
//! `GLM_API_KEY` / `SCOPUS_API_KEY` / `IEEE_API_KEY` environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::SourceKind;

pub const APP_NAME: &str = "paper-digest";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_CONFIG_PATH: &str = "config/default_config.json";

pub const GLM_API_KEY_VAR: &str = "GLM_API_KEY";
pub const SCOPUS_API_KEY_VAR: &str = "SCOPUS_API_KEY";
pub const IEEE_API_KEY_VAR: &str = "IEEE_API_KEY";

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "paper_digest_lib=info"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config not found: {0}")]
    NotFound(PathBuf),

    #[error("Cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Config must contain {0}")]
    MissingField(&'static str),
}

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub query: QueryConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub prompts: PromptConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Search and relevance profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    pub research_field: String,
    #[serde(default)]
    pub include_keywords: Vec<String>,
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub markdown_output_dir: PathBuf,
    pub pdf_output_dir: PathBuf,
    #[serde(alias = "OUTPUT_PDF")]
    pub output_pdf: bool,
    pub db_path: PathBuf,
    pub top_k: u32,
    pub window_days: u32,
    pub max_results: u32,
    pub min_interval_hours: u32,
    pub model_name: String,
    pub enabled_sources: Vec<SourceKind>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            markdown_output_dir: PathBuf::from("newspaper/markdown"),
            pdf_output_dir: PathBuf::from("newspaper/pdf"),
            output_pdf: false,
            db_path: PathBuf::from("newspaper/cache.sqlite3"),
            top_k: 10,
            window_days: 7,
            max_results: 200,
            min_interval_hours: 48,
            model_name: "glm-4.7".into(),
            enabled_sources: vec![SourceKind::Arxiv],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub ranker_system: String,
    pub summarizer_system: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            ranker_system: "You are an academic paper relevance scorer. Return strict JSON only."
                .into(),
            summarizer_system: "You are an academic summarizer. Return strict JSON only in English."
                .into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: crate::llm::DEFAULT_ENDPOINT.into(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub scopus_api_key: Option<String>,
    pub ieee_api_key: Option<String>,
}

fn default_categories() -> Vec<String> {
    vec!["cs.AI".into(), "cs.LG".into(), "stat.ML".into()]
}

// ═══════════════════════════════════════════════════════════
// Loading
// ═══════════════════════════════════════════════════════════

/// Load configuration from a JSON file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)?;
    parse_config(&text)
}

/// Parse configuration JSON text.
pub fn parse_config(text: &str) -> Result<AppConfig, ConfigError> {
    let raw: serde_json::Value =
        serde_json::from_str(text).map_err(|e| ConfigError::Invalid(e.to_string()))?;

    let has_field = raw
        .get("query")
        .and_then(|q| q.get("research_field"))
        .is_some_and(|f| f.is_string());
    if !has_field {
        return Err(ConfigError::MissingField("query.research_field"));
    }

    serde_json::from_value(raw).map_err(|e| ConfigError::Invalid(e.to_string()))
}

impl AppConfig {
    /// Fill absent credentials from a variable lookup (normally the process
    /// environment). Values already present in the file win.
    pub fn with_env_credentials<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if self.llm.api_key.as_deref().map_or(true, str::is_empty) {
            self.llm.api_key = non_empty(GLM_API_KEY_VAR);
        }
        if self.credentials.scopus_api_key.as_deref().map_or(true, str::is_empty) {
            self.credentials.scopus_api_key = non_empty(SCOPUS_API_KEY_VAR);
        }
        if self.credentials.ieee_api_key.as_deref().map_or(true, str::is_empty) {
            self.credentials.ieee_api_key = non_empty(IEEE_API_KEY_VAR);
        }
        self
    }
}

/// Effective settings, one `key=value` per line, for the startup log.
pub fn runtime_log_lines(config: &AppConfig) -> Vec<String> {
    let runtime = &config.runtime;
    let query = &config.query;
    let sources: Vec<&str> = runtime.enabled_sources.iter().map(|s| s.as_str()).collect();
    vec![
        format!("research_field={}", query.research_field),
        format!("include_keywords={:?}", query.include_keywords),
        format!("exclude_keywords={:?}", query.exclude_keywords),
        format!("enabled_sources={sources:?}"),
        format!("top_k={}", runtime.top_k),
        format!("window_days={}", runtime.window_days),
        format!("max_results={}", runtime.max_results),
        format!("min_interval_hours={}", runtime.min_interval_hours),
        format!("model_name={}", runtime.model_name),
        format!("markdown_output_dir={}", runtime.markdown_output_dir.display()),
        format!("output_pdf={}", runtime.output_pdf),
        format!("pdf_output_dir={}", runtime.pdf_output_dir.display()),
    ]
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
