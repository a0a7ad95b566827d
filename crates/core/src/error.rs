use crate::clock::ClockState;

/// Result alias that carries the custom [`BeatError`] type.
pub type Result<T> = std::result::Result<T, BeatError>;

/// Failure to bring up a music session. Unrecoverable for that session: the
/// game keeps running without beat events.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitError {
    /// No music event was configured.
    #[error("music event reference is null")]
    NullEventReference,
    /// The audio engine refused to create or wire the playback instance.
    #[error("audio engine rejected the playback instance: {0}")]
    EngineRejected(String),
}

/// A single call into the audio engine failed. The operation is skipped and
/// state is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("audio engine call `{operation}` failed: {reason}")]
pub struct EngineTransientError {
    pub operation: &'static str,
    pub reason: String,
}

impl EngineTransientError {
    pub fn new(operation: &'static str, reason: impl Into<String>) -> Self {
        Self {
            operation,
            reason: reason.into(),
        }
    }
}

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum BeatError {
    #[error(transparent)]
    Init(#[from] InitError),
    #[error(transparent)]
    Engine(#[from] EngineTransientError),
    /// The beat clock was asked to move between two states that are not
    /// connected in its lifecycle.
    #[error("beat clock cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: ClockState, to: ClockState },
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// A configuration file could not be read.
    #[error("configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration document: {0}")]
    Json(#[from] serde_json::Error),
}

impl BeatError {
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }
}
