//! Errors that abort a pipeline run.
//!
//! Source, ranking and summarizing failures are absorbed into skips or
//! fallbacks and never appear here.

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Writer error: {0}")]
    Writer(#[from] WriterError),
}

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF generation failed: {0}")]
    Pdf(String),
}
