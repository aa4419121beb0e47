//! Declaration error types.

use thiserror::Error;

/// Declaration errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A rule is malformed or names something that does not exist.
    #[error("invalid declaration: {0}")]
    Invalid(String),

    /// Failed to parse a declarations file.
    #[error("failed to parse declarations: {0}")]
    Parse(String),

    /// An I/O error occurred while reading declarations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
