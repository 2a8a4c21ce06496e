//! IEEE Xplore adapter: IEEE Metadata Search API, JSON response.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use super::{http_client, map_http_error, read_body};
use super::{PaperSource, SearchProfile, SourceError};
use crate::models::{Candidate, SourceKind};

pub const IEEE_API_URL: &str = "https://ieeexploreapi.ieee.org/api/v1/search/articles";

const MAX_PAGE: u32 = 200;
const MISSING_ABSTRACT: &str = "Abstract not available from IEEE API.";

pub struct IeeeXploreSource {
    profile: SearchProfile,
    api_key: String,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl IeeeXploreSource {
    pub fn new(profile: SearchProfile, api_key: &str) -> Self {
        Self {
            profile,
            api_key: api_key.to_string(),
            base_url: IEEE_API_URL.to_string(),
            client: http_client(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn build_querytext(&self) -> String {
        let include: Vec<String> = self
            .profile
            .include_terms()
            .into_iter()
            .map(|kw| format!("\"{kw}\""))
            .collect();

        let mut query = format!("({})", include.join(" OR "));
        for token in &self.profile.exclude_keywords {
            query.push_str(&format!(" NOT \"{token}\""));
        }
        query
    }

    fn fetch_json(&self) -> Result<Value, SourceError> {
        let max_records = self.profile.max_results.min(MAX_PAGE).to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("format", "json"),
                ("max_records", max_records.as_str()),
                ("start_record", "1"),
                ("sort_order", "desc"),
                ("sort_field", "article_number"),
                ("querytext", self.build_querytext().as_str()),
            ])
            .send()
            .map_err(map_http_error)?;
        let body = read_body(response)?;
        serde_json::from_str(&body).map_err(|e| SourceError::Parse(e.to_string()))
    }
}

impl PaperSource for IeeeXploreSource {
    fn name(&self) -> &str {
        SourceKind::IeeeXplore.as_str()
    }

    fn search_recent(&self) -> Result<Vec<Candidate>, SourceError> {
        let payload = self.fetch_json()?;
        Ok(parse_payload(&payload, Utc::now(), self.profile.window_days))
    }
}

/// Convert an IEEE search payload into candidates within the window.
pub fn parse_payload(payload: &Value, now: DateTime<Utc>, window_days: u32) -> Vec<Candidate> {
    let earliest = now - Duration::days(i64::from(window_days));
    let articles = payload
        .get("articles")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    articles
        .iter()
        .filter_map(parse_article)
        .filter(|candidate| candidate.published_at >= earliest)
        .collect()
}

fn parse_article(article: &Value) -> Option<Candidate> {
    let published_at = publication_date(article)?;

    let external_id = scalar_text(article.get("article_number"))?;
    let title = scalar_text(article.get("title"))?;

    let abstract_text =
        scalar_text(article.get("abstract")).unwrap_or_else(|| MISSING_ABSTRACT.to_string());
    let html_url = scalar_text(article.get("html_url")).unwrap_or_default();
    let pdf_url = scalar_text(article.get("pdf_url")).unwrap_or_else(|| html_url.clone());

    let (authors, affiliations) = authors_and_affiliations(article);

    Some(Candidate {
        source: SourceKind::IeeeXplore,
        external_id,
        title,
        abstract_text,
        authors,
        affiliations,
        published_at,
        updated_at: published_at,
        link: html_url,
        pdf_url,
        code_urls: Vec::new(),
        categories: index_terms(article),
    })
}

/// Trimmed, non-empty text of a string or number value.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

pub(crate) fn parse_publication_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    let date = NaiveDate::parse_from_str(text, "%d %B %Y")
        .or_else(|_| NaiveDate::parse_from_str(&format!("1 {text}"), "%d %B %Y"))
        .or_else(|_| NaiveDate::parse_from_str(&format!("1 January {text}"), "%d %B %Y"))
        .ok()?;
    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn publication_date(article: &Value) -> Option<DateTime<Utc>> {
    if let Some(parsed) = scalar_text(article.get("publication_date"))
        .as_deref()
        .and_then(parse_publication_date)
    {
        return Some(parsed);
    }

    let year: i32 = scalar_text(article.get("publication_year"))?.parse().ok()?;
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single()
}

fn authors_and_affiliations(article: &Value) -> (Vec<String>, Vec<String>) {
    let list = article
        .pointer("/authors/authors")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut authors = Vec::new();
    let mut affiliations: Vec<String> = Vec::new();
    for item in list.iter().filter(|item| item.is_object()) {
        if let Some(name) = scalar_text(item.get("full_name"))
            .or_else(|| scalar_text(item.get("author_order")))
        {
            authors.push(name);
        }
        if let Some(aff) = scalar_text(item.get("affiliation")) {
            if !affiliations.contains(&aff) {
                affiliations.push(aff);
            }
        }
    }

    if authors.is_empty() {
        authors.push("Unknown".to_string());
    }
    (authors, affiliations)
}

fn index_terms(article: &Value) -> Vec<String> {
    let Some(groups) = article.get("index_terms").and_then(Value::as_object) else {
        return Vec::new();
    };

    // Group order is payload order (serde_json `preserve_order`).
    let mut terms: Vec<String> = Vec::new();
    for group in groups.values() {
        let values = group
            .get("terms")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for value in values {
            if let Some(term) = scalar_text(Some(value)) {
                if !terms.contains(&term) {
                    terms.push(term);
                }
            }
        }
    }
    terms
}
