//! CLI error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The system description file does not exist.
    #[error("system description not found at {path}")]
    SystemNotFound { path: PathBuf },

    /// The system description is malformed.
    #[error("invalid system description: {0}")]
    System(String),

    /// A connection names a plug or slot nobody declared.
    #[error("connection refers to undeclared {kind} '{reference}'")]
    UndeclaredEndpoint { kind: &'static str, reference: String },

    /// `--backend` named something other than a known security backend.
    #[error("{0}")]
    UnknownBackend(String),

    /// Configuration is invalid or could not be read.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred in the interfaces layer.
    #[error(transparent)]
    Interfaces(#[from] interfaces::Error),

    /// An error occurred in the declarations layer.
    #[error(transparent)]
    Policy(#[from] policy::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
