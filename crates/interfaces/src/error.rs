//! Interface engine error types.

use crate::SecuritySystem;
use thiserror::Error;

/// Interface engine errors.
///
/// Two classes are kept apart: [`Error::Invariant`] signals a routing or
/// programming bug in the caller, every other variant is a recoverable
/// validation failure scoped to one plug, slot, connection or tag.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No interface is registered under this name.
    #[error("unknown interface {0:?}")]
    UnknownInterface(String),

    /// A plug or slot was rejected by its interface.
    #[error("{interface}: {reason}")]
    Sanitize { interface: String, reason: String },

    /// A connection was requested between a plug and a slot of different interfaces.
    #[error(
        "cannot connect {plug} ({plug_interface}) to {slot} ({slot_interface}): interface mismatch"
    )]
    InterfaceMismatch {
        plug: String,
        plug_interface: String,
        slot: String,
        slot_interface: String,
    },

    /// A precondition the caller must guarantee was broken.
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// Two interfaces were registered under the same name.
    #[error("interface {0:?} registered twice")]
    DuplicateInterface(String),

    /// A snippet producer failed or emitted text the backend cannot accept.
    #[error("{backend} snippet for {tags:?}: {reason}")]
    Snippet {
        backend: SecuritySystem,
        tags: Vec<String>,
        reason: String,
    },

    /// A seccomp filter source line is malformed.
    #[error("seccomp profile line {line}: {reason}")]
    SeccompProfile { line: usize, reason: String },

    /// A mount profile line is malformed.
    #[error("mount profile line {line}: {reason}")]
    MountProfile { line: usize, reason: String },

    /// A snap, app, plug or slot name outside the allowed character set.
    #[error("invalid {kind} name {name:?}")]
    InvalidName { kind: &'static str, name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a sanitization failure attributed to `interface`.
    pub fn sanitize(interface: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Sanitize {
            interface: interface.into(),
            reason: reason.into(),
        }
    }

    /// True for programming-error preconditions, which callers should
    /// treat as fatal for the current operation.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Error::Invariant(_) | Error::DuplicateInterface(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
