//! Error kinds per spec §7.
//!
//! Configuration and Input failures are fatal for the request and
//! surface as `Err`. Detection failures (anchor not found, line not
//! built) are soft: callers turn them into an empty-result response
//! rather than propagating an error, so `DetectionFailure` below is
//! used only as a log-carrying value, never returned from a public
//! entry point as `Err`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("input error: {0}")]
    Input(String),

    #[error("opencv error: {0}")]
    OpenCv(#[from] opencv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Error::Input(msg.into())
    }
}

/// Soft detection-stage outcome, logged but never propagated as `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionFailure {
    AnchorNotFound,
    LineNotInitialized,
}

impl std::fmt::Display for DetectionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionFailure::AnchorNotFound => write!(f, "no contour matched the anchor template"),
            DetectionFailure::LineNotInitialized => write!(f, "line could not be constructed"),
        }
    }
}
