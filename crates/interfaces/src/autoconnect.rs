//! Deciding whether a candidate connection is made without consent.

use crate::{Error, Plug, Registry, Result, Slot, SnapInfo};
use tracing::debug;

/// Declaration-based connection rules that can override an interface's
/// own auto-connect judgment.
pub trait ConnectionDeclarations {
    /// `Some(true)` to allow, `Some(false)` to refuse, `None` for no opinion.
    fn auto_connect(&self, plug: &Plug, slot: &Slot) -> Option<bool>;
}

/// Outcome of an auto-connect check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The connection may be established automatically.
    Connect,
    /// The connection needs an explicit user action.
    Ask { reason: String },
}

impl Decision {
    pub fn is_automatic(&self) -> bool {
        matches!(self, Decision::Connect)
    }
}

/// Two-layer auto-connect policy.
///
/// Declarations are consulted first; when they have no opinion the
/// interface's own predicate decides.
pub struct AutoConnectPolicy<'a> {
    registry: &'a Registry,
    declarations: Option<&'a dyn ConnectionDeclarations>,
}

impl<'a> AutoConnectPolicy<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            declarations: None,
        }
    }

    pub fn with_declarations(mut self, declarations: &'a dyn ConnectionDeclarations) -> Self {
        self.declarations = Some(declarations);
        self
    }

    /// Decide whether `plug` may be connected to `slot` automatically.
    pub fn decide(&self, plug: &Plug, slot: &Slot) -> Result<Decision> {
        if plug.interface != slot.interface {
            return Err(Error::InterfaceMismatch {
                plug: plug.to_string(),
                plug_interface: plug.interface.clone(),
                slot: slot.to_string(),
                slot_interface: slot.interface.clone(),
            });
        }
        let iface = self.registry.lookup(&plug.interface)?;

        if let Some(verdict) = self.declarations.and_then(|d| d.auto_connect(plug, slot)) {
            debug!(plug = %plug, slot = %slot, verdict, "decided by declaration");
            return Ok(if verdict {
                Decision::Connect
            } else {
                Decision::Ask {
                    reason: format!("auto-connection of {plug} to {slot} denied by declaration"),
                }
            });
        }

        Ok(if iface.auto_connect(plug, slot) {
            Decision::Connect
        } else {
            Decision::Ask {
                reason: format!("{} connections require manual connection", iface.name()),
            }
        })
    }
}

/// Every plug/slot pair of the same interface across different snaps.
pub fn candidates(snaps: &[SnapInfo]) -> Vec<(&Plug, &Slot)> {
    let mut pairs = Vec::new();
    for consumer in snaps {
        for plug in &consumer.plugs {
            for provider in snaps {
                if provider.name() == consumer.name() {
                    continue;
                }
                for slot in &provider.slots {
                    if slot.interface == plug.interface {
                        pairs.push((plug, slot));
                    }
                }
            }
        }
    }
    pairs
}
