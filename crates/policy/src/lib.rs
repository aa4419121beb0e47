//! Declaration-based connection rules.
//!
//! Rules override an interface's built-in auto-connect judgment for chosen
//! snaps or publishers. `deny` always wins over `allow`; when no rule
//! matches, the declarations have no opinion.

mod error;
mod policy;
mod rule;

pub use error::{Error, Result};
pub use policy::Declarations;
pub use rule::Rule;
