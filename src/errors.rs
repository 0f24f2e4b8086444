// src/errors.rs

use thiserror::Error;

/// Fatal failures of a clustering run. None of these are retried; the run
/// aborts before any artifact is written.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    /// Input file missing, unreadable, or lacking at least two feature columns.
    #[error("input error: {0}")]
    Input(String),
    /// No usable records remain after cleaning.
    #[error("data error: {0}")]
    Data(String),
    /// No candidate group count produced a valid partition, or a fit failed.
    #[error("computation error: {0}")]
    Computation(String),
}

impl PipelineError {
    pub fn input(msg: impl Into<String>) -> Self {
        PipelineError::Input(msg.into())
    }

    pub fn data(msg: impl Into<String>) -> Self {
        PipelineError::Data(msg.into())
    }

    pub fn computation(msg: impl Into<String>) -> Self {
        PipelineError::Computation(msg.into())
    }
}
