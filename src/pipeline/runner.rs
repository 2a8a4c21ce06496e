//! Single-run orchestration of the digest pipeline.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::dedup::{deduplicate_candidates, normalize_title};
use super::error::PipelineError;
use super::traits::{DigestStore, DigestWriter, Ranker, Renderer, Summarizer};
use super::types::{DigestSettings, PipelineRunResult};
use crate::db::DatabaseError;
use crate::models::PaperRecord;
use crate::sources::PaperSource;

/// Orchestrates one digest run: gate → fetch → dedup → persist → rank →
/// select → summarize → render → write → record.
///
/// Pure pipeline logic with trait-based DI. The store is shared so callers
/// can inspect history after a run.
pub struct DigestPipeline {
    source: Box<dyn PaperSource>,
    ranker: Box<dyn Ranker>,
    summarizer: Box<dyn Summarizer>,
    store: Arc<dyn DigestStore>,
    renderer: Box<dyn Renderer>,
    writer: Box<dyn DigestWriter>,
    settings: DigestSettings,
}

impl DigestPipeline {
    pub fn new(
        source: Box<dyn PaperSource>,
        ranker: Box<dyn Ranker>,
        summarizer: Box<dyn Summarizer>,
        store: Arc<dyn DigestStore>,
        renderer: Box<dyn Renderer>,
        writer: Box<dyn DigestWriter>,
        settings: DigestSettings,
    ) -> Self {
        Self {
            source,
            ranker,
            summarizer,
            store,
            renderer,
            writer,
            settings,
        }
    }

    /// Run the full pipeline once at `now`.
    ///
    /// Skips are reported in the result. Only store and writer failures
    /// are errors; a writer failure leaves no digest row behind.
    pub fn run(&self, now: DateTime<Utc>) -> Result<PipelineRunResult, PipelineError> {
        let settings = &self.settings;
        self.store.initialize()?;

        // Step 1: Gate
        if !self.store.should_run(now, settings.min_interval_hours)? {
            return Ok(skip(format!("Skipped by {}h gate", settings.min_interval_hours)));
        }

        // Step 2: Fetch
        tracing::info!(source = self.source.name(), "Digest run: fetching candidates");
        let candidates = match self.source.search_recent() {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(source = self.source.name(), error = %e, "Source fetch failed");
                return Ok(skip(format!("Source fetch failed: {e}")));
            }
        };
        let fetched = candidates.len();

        // Step 3: Dedup against history
        let seen = self.store.fetch_seen_keys()?;
        let fresh = deduplicate_candidates(candidates, &seen);
        tracing::info!(fetched, fresh = fresh.len(), "Digest run: candidates deduplicated");
        if fresh.is_empty() {
            return Ok(skip("No new papers after deduplication".into()));
        }

        // Step 4: Persist every fresh candidate, selected or not
        for candidate in &fresh {
            let record = PaperRecord::from_candidate(candidate, normalize_title(&candidate.title), now)
                .map_err(DatabaseError::from)?;
            self.store.upsert_paper(&record)?;
        }
        tracing::info!(persisted = fresh.len(), "Digest run: candidates persisted");

        // Step 5: Rank and select
        let ranked = self.ranker.rank(&fresh);
        if ranked.is_empty() {
            return Ok(skip("No candidate survives ranking".into()));
        }
        let ranked_count = ranked.len();
        let selected: Vec<_> = ranked.into_iter().take(settings.top_k as usize).collect();
        tracing::info!(
            ranked = ranked_count,
            selected = selected.len(),
            top_k = settings.top_k,
            "Digest run: candidates ranked"
        );

        // Step 6: Summarize in rank order
        let summaries: Vec<_> = selected
            .iter()
            .map(|item| self.summarizer.summarize(&item.candidate, item.score, &item.reason))
            .collect();
        tracing::info!(summaries = summaries.len(), "Digest run: papers summarized");

        // Steps 7-8: Render and write
        let run_date = now.date_naive();
        let text = self.renderer.render(run_date, &summaries);
        let output_path = self.writer.write(run_date, &text)?;
        tracing::info!(
            output = %output_path,
            bytes = text.len(),
            "Digest run: digest written"
        );

        // Step 9: Record
        let emitted_ids: Vec<String> = selected
            .iter()
            .map(|item| item.candidate.external_id.clone())
            .collect();
        let digest_id = self.store.record_digest(
            now,
            &output_path,
            &settings.model_used,
            settings.window_days,
            settings.top_k,
            &emitted_ids,
        )?;

        tracing::info!(
            digest_id,
            summaries = summaries.len(),
            output = %output_path,
            "Digest generated"
        );

        Ok(PipelineRunResult::generated(output_path, summaries.len(), emitted_ids))
    }
}

/// Skipped outcome; the reason is logged for the operator.
fn skip(reason: String) -> PipelineRunResult {
    tracing::info!(reason = %reason, "Digest run skipped");
    PipelineRunResult::skipped(reason)
}
