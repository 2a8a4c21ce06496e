use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigestRun {
    pub digest_id: i64,
    pub run_at: DateTime<Utc>,
    pub output_path: String,
    pub model_used: String,
    pub window_days: u32,
    pub top_k: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigestItem {
    pub digest_id: i64,
    pub external_id: String,
    pub rank_order: u32,
}
