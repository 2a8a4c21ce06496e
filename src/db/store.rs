//! SQLite-backed digest store: the sole writer of paper history and digest runs.
//!
//! One connection per process, guarded by a mutex so concurrent callers are
//! serialized. Digest rows and their items are written in one transaction.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;

use super::repository;
use super::sqlite::{open_database, open_memory_database, run_migrations};
use super::DatabaseError;
use crate::models::PaperRecord;
use crate::pipeline::traits::DigestStore;
use crate::pipeline::types::SeenKeys;

pub struct SqliteDigestStore {
    conn: Mutex<Connection>,
}

impl SqliteDigestStore {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_database(path)?))
    }

    /// In-memory store (for testing)
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_memory_database()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    pub fn last_run_at(&self) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        repository::last_run_at(&*self.conn()?)
    }

    pub fn paper_count(&self) -> Result<i64, DatabaseError> {
        repository::paper_count(&*self.conn()?)
    }

    pub fn digest_items(&self, digest_id: i64) -> Result<Vec<crate::models::DigestItem>, DatabaseError> {
        repository::digest_items(&*self.conn()?, digest_id)
    }

    pub fn list_digests(&self) -> Result<Vec<crate::models::DigestRun>, DatabaseError> {
        repository::list_digests(&*self.conn()?)
    }
}

impl DigestStore for SqliteDigestStore {
    fn initialize(&self) -> Result<(), DatabaseError> {
        run_migrations(&*self.conn()?)
    }

    fn should_run(&self, now: DateTime<Utc>, min_interval_hours: u32) -> Result<bool, DatabaseError> {
        let Some(last) = self.last_run_at()? else {
            return Ok(true);
        };
        let elapsed = now.signed_duration_since(last);
        Ok(elapsed >= Duration::hours(i64::from(min_interval_hours)))
    }

    fn fetch_seen_keys(&self) -> Result<SeenKeys, DatabaseError> {
        let (external_ids, title_keys) = repository::fetch_seen_keys(&*self.conn()?)?;
        Ok(SeenKeys {
            external_ids,
            title_keys,
        })
    }

    fn upsert_paper(&self, paper: &PaperRecord) -> Result<(), DatabaseError> {
        repository::upsert_paper(&*self.conn()?, paper)
    }

    fn record_digest(
        &self,
        run_at: DateTime<Utc>,
        output_path: &str,
        model_used: &str,
        window_days: u32,
        top_k: u32,
        ordered_ids: &[String],
    ) -> Result<i64, DatabaseError> {
        let digest_id = repository::insert_digest(
            &*self.conn()?,
            &run_at,
            output_path,
            model_used,
            window_days,
            top_k,
            ordered_ids,
        )?;
        tracing::debug!(digest_id, items = ordered_ids.len(), "Digest recorded");
        Ok(digest_id)
    }
}
