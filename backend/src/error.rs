use thiserror::Error;

use crate::pipeline::resolver::Field;

/// Failures of the time-series store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt price row {id}: {reason}")]
    CorruptRow { id: i64, reason: String },

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Why an ingestion cycle produced no record.
///
/// Per-source and per-field problems never show up here: they are absorbed
/// by the fallback resolver.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("an ingestion cycle is already in flight")]
    Busy,

    #[error("no value and no usable default for {field}")]
    ResolutionExhausted { field: Field },

    #[error("reading previous record failed: {0}")]
    StoreRead(#[source] StoreError),

    #[error("appending record failed: {0}")]
    Persistence(#[source] StoreError),
}

/// Structural configuration defects detected at startup.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("unit conversion constant must be finite and > 0, got {0}")]
    InvalidUnitConstant(f64),

    #[error("bounds for {field} are empty: ({min}, {max})")]
    InvalidBounds { field: Field, min: f64, max: f64 },

    #[error("default for {field} must be finite, got {value}")]
    NonFiniteDefault { field: Field, value: f64 },

    #[error("source {0} has an empty url")]
    EmptyUrl(&'static str),

    #[error("source {0} has a zero timeout")]
    ZeroTimeout(&'static str),

    #[error("scrape interval must be non-zero")]
    ZeroInterval,

    #[error("unknown cycle policy {0:?} (expected \"coalesce\" or \"queue\")")]
    UnknownPolicy(String),
}
