use crate::models::Candidate;

use super::{PaperSource, SourceError};

/// Sequential fan-out over several adapters.
///
/// Adapters are called one at a time in list order and their candidates are
/// concatenated in that order. A failing adapter contributes nothing; the
/// aggregate fails only when every adapter failed.
pub struct MultiSource {
    sources: Vec<Box<dyn PaperSource>>,
}

impl MultiSource {
    pub fn new(sources: Vec<Box<dyn PaperSource>>) -> Result<Self, SourceError> {
        if sources.is_empty() {
            return Err(SourceError::NoSources);
        }
        Ok(Self { sources })
    }
}

impl PaperSource for MultiSource {
    fn name(&self) -> &str {
        "multi"
    }

    fn search_recent(&self) -> Result<Vec<Candidate>, SourceError> {
        let mut all_candidates = Vec::new();
        let mut errors = Vec::new();

        for source in &self.sources {
            match source.search_recent() {
                Ok(items) => {
                    tracing::info!(
                        source = source.name(),
                        candidates = items.len(),
                        "Source completed"
                    );
                    all_candidates.extend(items);
                }
                Err(e) => {
                    tracing::warn!(source = source.name(), error = %e, "Source failed");
                    errors.push(format!("{}: {e}", source.name()));
                }
            }
        }

        if errors.len() == self.sources.len() {
            return Err(SourceError::AllFailed(errors));
        }
        Ok(all_candidates)
    }
}
