//! Bibliographic source adapters and the multi-source aggregator.
//!
//! Each adapter queries one catalog, bounds results to the recency window and
//! result cap, and raises on unrecoverable fetch or parse failure.

pub mod arxiv;
pub mod code_urls;
pub mod ieee;
pub mod multi;
pub mod scopus;

pub use arxiv::ArxivSource;
pub use code_urls::extract_code_urls;
pub use ieee::IeeeXploreSource;
pub use multi::MultiSource;
pub use scopus::ScopusSource;

use std::time::Duration;

use thiserror::Error;

use crate::config::AppConfig;
use crate::models::{Candidate, SourceKind};

const HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No paper sources configured")]
    NoSources,

    #[error("{}", .0.join("; "))]
    AllFailed(Vec<String>),
}

/// One upstream catalog of recent papers.
pub trait PaperSource: Send + Sync {
    /// Adapter identity used in logs and combined errors.
    fn name(&self) -> &str;

    /// Fetch candidates published within the configured window.
    fn search_recent(&self) -> Result<Vec<Candidate>, SourceError>;
}

/// Query parameters shared by every adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchProfile {
    pub research_field: String,
    pub include_keywords: Vec<String>,
    pub exclude_keywords: Vec<String>,
    pub max_results: u32,
    pub window_days: u32,
}

impl SearchProfile {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            research_field: config.query.research_field.clone(),
            include_keywords: config.query.include_keywords.clone(),
            exclude_keywords: config.query.exclude_keywords.clone(),
            max_results: config.runtime.max_results,
            window_days: config.runtime.window_days,
        }
    }

    /// Include keywords, or the research field when none are configured.
    pub(crate) fn include_terms(&self) -> Vec<&str> {
        if self.include_keywords.is_empty() {
            vec![self.research_field.as_str()]
        } else {
            self.include_keywords.iter().map(String::as_str).collect()
        }
    }
}

pub(crate) fn http_client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .user_agent(concat!("paper-digest/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .expect("Failed to create HTTP client")
}

pub(crate) fn map_http_error(e: reqwest::Error) -> SourceError {
    if e.is_timeout() {
        SourceError::Http(format!("Request timed out after {HTTP_TIMEOUT_SECS}s"))
    } else {
        SourceError::Http(e.to_string())
    }
}

/// Body text of a successful response, or `SourceError::Api`.
pub(crate) fn read_body(response: reqwest::blocking::Response) -> Result<String, SourceError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(SourceError::Api {
            status: status.as_u16(),
            body,
        });
    }
    response.text().map_err(map_http_error)
}

/// Collapse internal whitespace runs to single spaces and trim.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Adapters for every enabled source whose credentials are available.
/// Scopus and IEEE Xplore are skipped when their API key is absent.
pub fn build_adapters(config: &AppConfig) -> Vec<Box<dyn PaperSource>> {
    let profile = SearchProfile::from_config(config);
    let mut adapters: Vec<Box<dyn PaperSource>> = Vec::new();

    for kind in &config.runtime.enabled_sources {
        match kind {
            SourceKind::Arxiv => adapters.push(Box::new(ArxivSource::new(
                profile.clone(),
                config.query.categories.clone(),
            ))),
            SourceKind::Scopus => match non_empty(&config.credentials.scopus_api_key) {
                Some(key) => adapters.push(Box::new(ScopusSource::new(profile.clone(), key))),
                None => tracing::warn!(source = kind.as_str(), "API key missing, source skipped"),
            },
            SourceKind::IeeeXplore => match non_empty(&config.credentials.ieee_api_key) {
                Some(key) => adapters.push(Box::new(IeeeXploreSource::new(profile.clone(), key))),
                None => tracing::warn!(source = kind.as_str(), "API key missing, source skipped"),
            },
        }
    }
    adapters
}

/// The source the pipeline fetches from: a single adapter directly, or a
/// `MultiSource` over several.
pub fn build_source(config: &AppConfig) -> Result<Box<dyn PaperSource>, SourceError> {
    let mut adapters = build_adapters(config);
    match adapters.len() {
        0 => Err(SourceError::NoSources),
        1 => Ok(adapters.remove(0)),
        _ => Ok(Box::new(MultiSource::new(adapters)?)),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn make_config(sources: &str, credentials: &str) -> AppConfig {
        let text = format!(
            r#"{{"query": {{"research_field": "Traffic engineering",
                           "include_keywords": ["intelligent transportation"],
                           "exclude_keywords": ["protein"],
                           "categories": ["cs.AI"]}},
                "runtime": {{"enabled_sources": {sources}, "max_results": 100}},
                "credentials": {credentials}}}"#
        );
        parse_config(&text).unwrap()
    }

    #[test]
    fn all_sources_built_when_keys_present() {
        let config = make_config(
            r#"["arxiv", "scopus", "ieee_xplore"]"#,
            r#"{"scopus_api_key": "dummy_scopus", "ieee_api_key": "dummy_ieee"}"#,
        );
        let adapters = build_adapters(&config);
        let names: Vec<&str> = adapters.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["arxiv", "scopus", "ieee_xplore"]);

        let source = build_source(&config).unwrap();
        assert_eq!(source.name(), "multi");
    }

    #[test]
    fn keyless_sources_skipped() {
        let config = make_config(r#"["arxiv", "scopus", "ieee_xplore"]"#, r#"{"scopus_api_key": " "}"#);
        let source = build_source(&config).unwrap();
        assert_eq!(source.name(), "arxiv");
    }

    #[test]
    fn no_usable_source_is_an_error() {
        let config = make_config(r#"["scopus"]"#, "{}");
        assert!(matches!(build_source(&config), Err(SourceError::NoSources)));

        let config = make_config(r#"[]"#, "{}");
        assert!(matches!(build_source(&config), Err(SourceError::NoSources)));
    }

    #[test]
    fn include_terms_fall_back_to_field() {
        let mut profile = SearchProfile::from_config(&make_config(r#"["arxiv"]"#, "{}"));
        assert_eq!(profile.include_terms(), vec!["intelligent transportation"]);

        profile.include_keywords.clear();
        assert_eq!(profile.include_terms(), vec!["Traffic engineering"]);
    }

    #[test]
    fn all_failed_joins_adapter_errors() {
        let err = SourceError::AllFailed(vec!["arxiv: timeout".into(), "scopus: 401".into()]);
        assert_eq!(err.to_string(), "arxiv: timeout; scopus: 401");
    }

    #[test]
    fn whitespace_collapsed() {
        assert_eq!(collapse_whitespace("  Deep\n   learning\tfor  x "), "Deep learning for x");
    }
}
