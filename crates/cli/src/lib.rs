//! Library side of the `confine` command.
//!
//! - [`config`] reads `confine.toml`.
//! - [`system`] loads a description of installed snaps and connections.
//! - [`commands`] implements each subcommand against a writer.

pub mod commands;
pub mod config;
pub mod error;
pub mod system;

pub use config::{Config, ConfigError};
pub use error::{Error, Result};
pub use system::System;
