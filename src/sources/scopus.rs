//! Scopus adapter: Elsevier Search API, JSON response.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use super::{http_client, map_http_error, read_body};
use super::{PaperSource, SearchProfile, SourceError};
use crate::models::{Candidate, SourceKind};

pub const SCOPUS_SEARCH_URL: &str = "https://api.elsevier.com/content/search/scopus";

const MAX_PAGE: u32 = 200;
const MISSING_ABSTRACT: &str = "Abstract not available from Scopus API.";

pub struct ScopusSource {
    profile: SearchProfile,
    api_key: String,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl ScopusSource {
    pub fn new(profile: SearchProfile, api_key: &str) -> Self {
        Self {
            profile,
            api_key: api_key.to_string(),
            base_url: SCOPUS_SEARCH_URL.to_string(),
            client: http_client(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn build_query(&self) -> String {
        let terms: Vec<String> = self
            .profile
            .include_terms()
            .into_iter()
            .map(|kw| format!("TITLE-ABS-KEY(\"{kw}\")"))
            .collect();

        let mut query = format!("({})", terms.join(" OR "));
        for token in &self.profile.exclude_keywords {
            query.push_str(&format!(" AND NOT TITLE-ABS-KEY(\"{token}\")"));
        }
        query
    }

    fn fetch_json(&self) -> Result<Value, SourceError> {
        let count = self.profile.max_results.min(MAX_PAGE).to_string();
        let response = self
            .client
            .get(&self.base_url)
            .header("Accept", "application/json")
            .header("X-ELS-APIKey", &self.api_key)
            .query(&[
                ("query", self.build_query().as_str()),
                ("count", count.as_str()),
                ("view", "COMPLETE"),
                ("sort", "-coverDate"),
            ])
            .send()
            .map_err(map_http_error)?;
        let body = read_body(response)?;
        serde_json::from_str(&body).map_err(|e| SourceError::Parse(e.to_string()))
    }
}

impl PaperSource for ScopusSource {
    fn name(&self) -> &str {
        SourceKind::Scopus.as_str()
    }

    fn search_recent(&self) -> Result<Vec<Candidate>, SourceError> {
        let payload = self.fetch_json()?;
        Ok(parse_payload(&payload, Utc::now(), self.profile.window_days))
    }
}

/// Convert a Scopus search payload into candidates within the window.
/// Entries without a usable date, identifier or title are skipped.
pub fn parse_payload(payload: &Value, now: DateTime<Utc>, window_days: u32) -> Vec<Candidate> {
    let earliest = now - Duration::days(i64::from(window_days));
    let entries = payload
        .pointer("/search-results/entry")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    entries
        .iter()
        .filter_map(parse_entry)
        .filter(|candidate| candidate.published_at >= earliest)
        .collect()
}

fn parse_entry(entry: &Value) -> Option<Candidate> {
    let published_at = str_field(entry, "prism:coverDate")
        .or_else(|| str_field(entry, "prism:coverDisplayDate"))
        .and_then(parse_cover_date)?;

    let external_id = ["dc:identifier", "eid", "prism:url", "prism:doi"]
        .iter()
        .find_map(|key| str_field(entry, key))?
        .replace("SCOPUS_ID:", "");

    let title = str_field(entry, "dc:title")?.trim().to_string();
    if title.is_empty() {
        return None;
    }

    let abstract_text = str_field(entry, "dc:description")
        .unwrap_or(MISSING_ABSTRACT)
        .trim()
        .to_string();

    let authors = match str_field(entry, "dc:creator") {
        Some(creator) => vec![creator.to_string()],
        None => vec!["Unknown".to_string()],
    };

    let link = scopus_link(entry)
        .or_else(|| str_field(entry, "prism:url").map(str::to_string))
        .unwrap_or_else(|| {
            format!(
                "https://www.scopus.com/results/results.uri?sort=plf-f&src=s&sid=&sot=b&sdt=b&sl=0&s={external_id}"
            )
        });

    Some(Candidate {
        source: SourceKind::Scopus,
        external_id,
        title,
        abstract_text,
        authors,
        affiliations: affiliations(entry),
        published_at,
        updated_at: published_at,
        pdf_url: link.clone(),
        link,
        code_urls: Vec::new(),
        categories: keywords(entry),
    })
}

fn str_field<'a>(entry: &'a Value, key: &str) -> Option<&'a str> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Scopus sometimes returns a single object where an array is expected.
fn as_items(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(obj @ Value::Object(_)) => vec![obj],
        _ => Vec::new(),
    }
}

pub(crate) fn parse_cover_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{text}-01"), "%Y-%m-%d"))
        .or_else(|_| NaiveDate::parse_from_str(&format!("{text}-01-01"), "%Y-%m-%d"));

    if let Ok(date) = date {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive));
    }

    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn affiliations(entry: &Value) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for aff in as_items(entry.get("affiliation")) {
        if let Some(name) = str_field(aff, "affilname") {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

fn scopus_link(entry: &Value) -> Option<String> {
    as_items(entry.get("link"))
        .into_iter()
        .find(|item| item.get("@ref").and_then(Value::as_str) == Some("scopus"))
        .and_then(|item| str_field(item, "@href"))
        .map(str::to_string)
}

fn keywords(entry: &Value) -> Vec<String> {
    let Some(raw) = str_field(entry, "authkeywords") else {
        return Vec::new();
    };
    let separator = if raw.contains('|') {
        '|'
    } else if raw.contains(';') {
        ';'
    } else {
        ','
    };
    raw.split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
