//! Errors raised by the shared settings, event and curve code
//!
//! `cloude-ap` wraps these in its own error type; the HTTP layer answers
//! `InvalidInput` with 400.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Reading or writing the settings file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file could not be parsed or serialised
    #[error("Configuration error: {0}")]
    Config(String),

    /// A caller-supplied value is out of range or malformed
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
