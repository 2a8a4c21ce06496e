//! Two-key deduplication: external id and normalized title.
//!
//! A candidate is dropped when either key was seen in history or earlier in
//! the same batch. First occurrence wins; input order is preserved.

use std::sync::LazyLock;

use regex::Regex;

use super::types::SeenKeys;
use crate::models::Candidate;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid title regex"));

/// Lowercase, collapse every non-alphanumeric run to one space, trim.
/// Only ASCII letters and digits survive.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    NON_ALNUM.replace_all(&lowered, " ").trim().to_string()
}

/// Single left-to-right pass over `candidates`. The history sets are copied,
/// then grown with each accepted candidate's keys.
pub fn deduplicate_candidates(candidates: Vec<Candidate>, seen: &SeenKeys) -> Vec<Candidate> {
    let mut local_ids = seen.external_ids.clone();
    let mut local_titles = seen.title_keys.clone();
    let mut deduped = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let title_key = normalize_title(&candidate.title);
        if local_ids.contains(&candidate.external_id) || local_titles.contains(&title_key) {
            tracing::debug!(external_id = %candidate.external_id, "Duplicate candidate dropped");
            continue;
        }
        local_ids.insert(candidate.external_id.clone());
        local_titles.insert(title_key);
        deduped.push(candidate);
    }

    deduped
}
