use serde::{Deserialize, Serialize};

use super::enums::SourceKind;

/// Structured digest entry for one selected paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub external_id: String,
    pub source: SourceKind,
    pub title: String,
    pub authors: Vec<String>,
    pub affiliations: Vec<String>,
    pub link: String,
    pub pdf_url: String,
    pub code_urls: Vec<String>,
    pub problem: String,
    pub approach: String,
    pub methodological_novelty: String,
    pub empirical_novelty: String,
    /// Four to five plain-language sentences.
    pub talk_track: Vec<String>,
    pub relevance_score: f64,
    pub relevance_reason: String,
}
