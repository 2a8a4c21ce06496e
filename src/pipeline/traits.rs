//! Collaborator contracts for the digest pipeline.
//!
//! The orchestrator depends only on these traits (plus `PaperSource`), so
//! every stage can be replaced with a test double.

use chrono::{DateTime, NaiveDate, Utc};

use super::error::WriterError;
use super::types::{RankedCandidate, SeenKeys};
use crate::db::DatabaseError;
use crate::models::{Candidate, PaperRecord, Summary};

/// Orders candidates by relevance.
pub trait Ranker: Send + Sync {
    /// Descending by score. Empty input yields empty output.
    fn rank(&self, candidates: &[Candidate]) -> Vec<RankedCandidate>;
}

/// Produces one structured summary per selected candidate. Never fails.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, candidate: &Candidate, score: f64, reason: &str) -> Summary;
}

/// Persisted paper history and digest runs; owns the run gate.
pub trait DigestStore: Send + Sync {
    /// Idempotent schema creation.
    fn initialize(&self) -> Result<(), DatabaseError>;

    /// True when no digest exists or the last one is at least
    /// `min_interval_hours` before `now`.
    fn should_run(&self, now: DateTime<Utc>, min_interval_hours: u32) -> Result<bool, DatabaseError>;

    fn fetch_seen_keys(&self) -> Result<SeenKeys, DatabaseError>;

    /// Insert, or refresh everything except id and first-seen time.
    fn upsert_paper(&self, paper: &PaperRecord) -> Result<(), DatabaseError>;

    /// Append one digest run and its ordered items atomically; returns the digest id.
    fn record_digest(
        &self,
        run_at: DateTime<Utc>,
        output_path: &str,
        model_used: &str,
        window_days: u32,
        top_k: u32,
        ordered_ids: &[String],
    ) -> Result<i64, DatabaseError>;
}

/// Pure, deterministic digest rendering.
pub trait Renderer: Send + Sync {
    fn render(&self, run_date: NaiveDate, summaries: &[Summary]) -> String;
}

/// Persists rendered text; returns the canonical output path.
pub trait DigestWriter: Send + Sync {
    fn write(&self, run_date: NaiveDate, text: &str) -> Result<String, WriterError>;
}
