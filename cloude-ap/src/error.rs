//! Error types for cloude-ap
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use cloude_common::events::SlotId;
use thiserror::Error;

/// Main error type for cloude-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Audio graph misuse (unknown node, bad port, missing parameter)
    #[error("Audio graph error: {0}")]
    Graph(String),

    /// Automation event rejected by an AudioParam
    #[error("Invalid automation: {0}")]
    InvalidAutomation(String),

    /// A media source already exists for this slot
    #[error("Media source already exists for slot {0}")]
    SourceAlreadyExists(SlotId),

    /// Playback element refused to start (decode failure, autoplay policy)
    #[error("Playback rejected on slot {slot}: {reason}")]
    PlayRejected { slot: SlotId, reason: String },

    /// Another track change is still in flight
    #[error("Transition already in flight")]
    TransitionInFlight,

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Queue management errors
    #[error("Queue error: {0}")]
    Queue(String),

    /// Tag probing, decoding or resampling errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Output device could not be opened or started
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the shared library
    #[error(transparent)]
    Common(#[from] cloude_common::Error),
}

/// Convenience Result type using cloude-ap Error
pub type Result<T> = std::result::Result<T, Error>;
