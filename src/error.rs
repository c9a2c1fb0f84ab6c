//! Application-wide error types.
//!
//! Provider failures never reach this enum; the router absorbs them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("comms error: {0}")]
    Comms(String),

    #[error("report error: {0}")]
    Report(String),

    #[error("unknown session: {0}")]
    UnknownSession(String),

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
