//! Capability interfaces between confined snaps.
//!
//! A snap declares *plugs* (capabilities it consumes) and *slots*
//! (capabilities it provides). This crate turns those declarations, and the
//! connections established between them, into security policy for each
//! confinement backend.
//!
//! # Core Concepts
//!
//! ## Interface
//!
//! [`Interface`] is the contract every capability type implements: sanitize
//! plugs and slots, decide auto-connection, and contribute backend policy.
//! Implementations are looked up by name through a [`Registry`].
//!
//! ## Specification
//!
//! A [`Specification`] accumulates policy fragments for one backend, keyed
//! by security tag (`snap.<snap>.<app>`). The backends are [`apparmor`],
//! [`seccomp`], [`udev`], [`dbus`] and [`mount`].
//!
//! ## Sanitizer, auto-connect and compiler
//!
//! - [`sanitize_snap`] validates declarations at install time.
//! - [`AutoConnectPolicy`] decides whether a candidate connection needs
//!   explicit consent.
//! - [`Compiler`] runs every backend over a set of snaps and connections.
//!
//! # Example
//!
//! ```no_run
//! use interfaces::{apparmor, Connection, Plug, Registry, Slot, Snap, SnapType};
//! use std::sync::Arc;
//!
//! # fn example(registry: &Registry) -> interfaces::Result<()> {
//! let app = Arc::new(Snap::new("docker", SnapType::App).with_apps(["app"]));
//! let core = Arc::new(Snap::new("core", SnapType::Os));
//! let conn = Connection::new(
//!     Plug::new(app, "docker", "docker"),
//!     Slot::new(core, "docker", "docker"),
//! )?;
//!
//! let iface = registry.lookup(conn.interface())?;
//! let mut spec = apparmor::Specification::new();
//! spec.add_connected_plug(iface, conn.plug(), conn.slot())?;
//! for tag in spec.security_tags() {
//!     println!("{tag}:\n{}", spec.snippet_for_tag(&tag));
//! }
//! # Ok(())
//! # }
//! ```

pub mod apparmor;
mod autoconnect;
mod compiler;
pub mod dbus;
mod error;
mod interface;
pub mod mount;
mod registry;
mod sanitize;
pub mod seccomp;
mod snap;
pub mod specification;
pub mod udev;

pub use autoconnect::{AutoConnectPolicy, ConnectionDeclarations, Decision, candidates};
pub use compiler::{CompiledBackend, Compiler};
pub use error::{Error, Result};
pub use interface::{Interface, SecuritySystem, ensure_plug, ensure_slot};
pub use registry::Registry;
pub use sanitize::{Rejected, SanitizeReport, sanitize_plug, sanitize_slot, sanitize_snap};
pub use snap::{
    Attributes, Connection, Plug, Slot, Snap, SnapInfo, SnapType, security_tag, validate_app_name,
    validate_snap_name,
};
pub use specification::{Scope, SecurityBackend, Specification};
