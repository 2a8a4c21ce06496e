use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::SourceKind;

/// One paper as returned by a bibliographic source, normalized and UTC-stamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub source: SourceKind,
    pub external_id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub affiliations: Vec<String>,
    pub published_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Canonical landing page (arXiv abstract page, Scopus record, IEEE article).
    pub link: String,
    pub pdf_url: String,
    pub code_urls: Vec<String>,
    pub categories: Vec<String>,
}

/// Durable row for a seen paper. List fields are stored as JSON arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperRecord {
    pub external_id: String,
    pub source: SourceKind,
    pub title_raw: String,
    pub title_norm: String,
    pub abstract_raw: String,
    pub authors_json: String,
    pub affiliations_json: String,
    pub published_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub link: String,
    pub pdf_url: String,
    pub code_urls_json: String,
    pub categories_json: String,
    pub first_seen_at: DateTime<Utc>,
}

impl PaperRecord {
    pub fn from_candidate(
        candidate: &Candidate,
        title_norm: String,
        first_seen_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            external_id: candidate.external_id.clone(),
            source: candidate.source,
            title_raw: candidate.title.clone(),
            title_norm,
            abstract_raw: candidate.abstract_text.clone(),
            authors_json: serde_json::to_string(&candidate.authors)?,
            affiliations_json: serde_json::to_string(&candidate.affiliations)?,
            published_at: candidate.published_at,
            updated_at: candidate.updated_at,
            link: candidate.link.clone(),
            pdf_url: candidate.pdf_url.clone(),
            code_urls_json: serde_json::to_string(&candidate.code_urls)?,
            categories_json: serde_json::to_string(&candidate.categories)?,
            first_seen_at,
        })
    }
}
