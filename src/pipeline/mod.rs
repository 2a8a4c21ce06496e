//! Daily digest pipeline.
//!
//! ```text
//! gate → fetch → dedup → persist → rank → select → summarize → render → write → record
//! ```
//!
//! Every collaborator sits behind a trait so the orchestrator can be driven
//! with test doubles. Skips are values, not errors: only store and writer
//! failures escape `DigestPipeline::run`.

pub mod error;
pub mod types;
pub mod traits;
pub mod dedup;
pub mod ranking;
pub mod summarize;
pub mod render;
pub mod writer;
pub mod runner;

pub use error::{PipelineError, WriterError};
pub use types::*;
pub use traits::*;
pub use dedup::{deduplicate_candidates, normalize_title};
pub use ranking::{heuristic_rank, RankingProfile, RelevanceRanker};
pub use summarize::{normalize_talk_track, PaperSummarizer};
pub use render::{render_markdown_digest, MarkdownRenderer};
pub use writer::{parse_markdown_blocks, MarkdownBlock, MarkdownWriter};
pub use runner::DigestPipeline;
