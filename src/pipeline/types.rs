//! Value types passed between pipeline stages.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::Candidate;

/// Dedup keys already in history: external ids and normalized titles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeenKeys {
    pub external_ids: HashSet<String>,
    pub title_keys: HashSet<String>,
}

/// A candidate with its relevance score (nominally 0-100) and reason.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub candidate: Candidate,
    pub score: f64,
    pub reason: String,
}

/// Run parameters the orchestrator needs beyond its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct DigestSettings {
    pub top_k: u32,
    pub min_interval_hours: u32,
    pub window_days: u32,
    pub model_used: String,
}

/// Outcome of one pipeline run.
///
/// Exactly one of `output_path` / `skipped_reason` is set, matching `generated`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineRunResult {
    pub generated: bool,
    pub summary_count: usize,
    pub output_path: Option<String>,
    pub skipped_reason: Option<String>,
    pub emitted_ids: Vec<String>,
}

impl PipelineRunResult {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            generated: false,
            summary_count: 0,
            output_path: None,
            skipped_reason: Some(reason.into()),
            emitted_ids: Vec::new(),
        }
    }

    pub fn generated(output_path: String, summary_count: usize, emitted_ids: Vec<String>) -> Self {
        Self {
            generated: true,
            summary_count,
            output_path: Some(output_path),
            skipped_reason: None,
            emitted_ids,
        }
    }
}
