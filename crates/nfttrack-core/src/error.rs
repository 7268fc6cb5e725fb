//! Error types for the transfer-tracking pipeline.

use thiserror::Error;

/// Errors that can occur while tracking transfers.
///
/// `Config` and `Connection` are fatal; `Decode`, `Range` and `Store` only
/// ever affect a single log and never abort a batch.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("event source unavailable: {0}")]
    Connection(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("token id {token_id} does not fit the store's integer key")]
    Range { token_id: String },

    #[error("store error: {0}")]
    Store(String),

    #[error("tracker cancelled")]
    Cancelled,
}

impl TrackerError {
    /// Returns `true` if the error must stop the tracker.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Connection(_))
    }

    /// Returns `true` if the error is scoped to a single log and the batch
    /// should continue.
    pub fn is_per_log(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Range { .. } | Self::Store(_))
    }
}

/// Reasons a raw log cannot be turned into a transfer fact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("expected {expected} topics, got {actual}")]
    TopicCount { expected: usize, actual: usize },

    #[error("topic0 {actual} does not match event signature {expected}")]
    SignatureMismatch { expected: String, actual: String },

    #[error("topic {index} is malformed: {reason}")]
    MalformedTopic { index: usize, reason: String },

    #[error("log field '{field}' is malformed: {reason}")]
    MalformedField { field: &'static str, reason: String },
}
