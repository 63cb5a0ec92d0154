// src/error.rs
//
// Errors reported by control-side calls.
//
// The real-time path never returns these; it degrades to silence or a no-op.

use thiserror::Error;

/// Errors from lifecycle, parameter, event and external data calls.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("engine is already initialized")]
    AlreadyInitialized,

    #[error("engine must be initialized before {0}")]
    NotInitialized(&'static str),

    #[error("invalid audio configuration: sample rate {sample_rate}, block size {block_size}")]
    InvalidConfiguration { sample_rate: f64, block_size: usize },

    #[error("parameter index {index} out of range ({count} parameters)")]
    InvalidParameter { index: usize, count: usize },

    #[error("value {0} is not a finite number")]
    InvalidValue(f64),

    #[error("event time {0} is not a finite number")]
    InvalidTime(f64),

    #[error("event payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("{0} queue is full")]
    QueueFull(&'static str),

    #[error("no free external data slot for '{0}'")]
    TooManyExternalData(String),

    #[error("external data '{0}' is not registered")]
    UnknownExternalData(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors from parsing a preset collection.
#[derive(Debug, Error)]
pub enum PresetError {
    #[error("preset collection is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("malformed preset collection: {0}")]
    Malformed(#[from] serde_json::Error),
}
