//! The capability contract every interface implements.

use crate::apparmor::AppArmor;
use crate::dbus::DBus;
use crate::mount::Mount;
use crate::seccomp::SecComp;
use crate::specification::Scope;
use crate::udev::UDev;
use crate::{Error, Plug, Result, Slot};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Security backends that consume generated policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecuritySystem {
    AppArmor,
    SecComp,
    UDev,
    DBus,
    Mount,
}

impl SecuritySystem {
    pub const ALL: [SecuritySystem; 5] = [
        SecuritySystem::AppArmor,
        SecuritySystem::SecComp,
        SecuritySystem::UDev,
        SecuritySystem::DBus,
        SecuritySystem::Mount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SecuritySystem::AppArmor => "apparmor",
            SecuritySystem::SecComp => "seccomp",
            SecuritySystem::UDev => "udev",
            SecuritySystem::DBus => "dbus",
            SecuritySystem::Mount => "mount",
        }
    }
}

impl fmt::Display for SecuritySystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SecuritySystem {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SecuritySystem::ALL
            .into_iter()
            .find(|system| system.as_str() == s)
            .ok_or_else(|| format!("unknown security backend {s:?}"))
    }
}

/// A named capability type.
///
/// Implementations are stateless singletons shared by every snap. Each one
/// validates its plugs and slots, decides whether a pairing may connect
/// without consent, and contributes policy to any backend it cares about.
/// Every backend hook defaults to contributing nothing.
///
/// The sanitize methods may only be called with a plug or slot whose
/// `interface` equals [`Interface::name`]; anything else is reported as
/// [`Error::Invariant`].
pub trait Interface: Send + Sync + fmt::Debug {
    /// Stable identifier, used as the `interface:` key and registry key.
    fn name(&self) -> &'static str;

    /// Validate, and possibly normalize, a plug.
    fn sanitize_plug(&self, plug: &mut Plug) -> Result<()> {
        ensure_plug(self.name(), plug)
    }

    /// Validate, and possibly normalize, a slot.
    fn sanitize_slot(&self, slot: &mut Slot) -> Result<()> {
        ensure_slot(self.name(), slot)
    }

    /// Whether this pairing may be connected without explicit consent.
    fn auto_connect(&self, plug: &Plug, slot: &Slot) -> bool;

    fn apparmor_permanent_plug(&self, _spec: &mut Scope<'_, AppArmor>, _plug: &Plug) -> Result<()> {
        Ok(())
    }

    fn apparmor_permanent_slot(&self, _spec: &mut Scope<'_, AppArmor>, _slot: &Slot) -> Result<()> {
        Ok(())
    }

    fn apparmor_connected_plug(
        &self,
        _spec: &mut Scope<'_, AppArmor>,
        _plug: &Plug,
        _slot: &Slot,
    ) -> Result<()> {
        Ok(())
    }

    fn apparmor_connected_slot(
        &self,
        _spec: &mut Scope<'_, AppArmor>,
        _plug: &Plug,
        _slot: &Slot,
    ) -> Result<()> {
        Ok(())
    }

    fn seccomp_permanent_plug(&self, _spec: &mut Scope<'_, SecComp>, _plug: &Plug) -> Result<()> {
        Ok(())
    }

    fn seccomp_permanent_slot(&self, _spec: &mut Scope<'_, SecComp>, _slot: &Slot) -> Result<()> {
        Ok(())
    }

    fn seccomp_connected_plug(
        &self,
        _spec: &mut Scope<'_, SecComp>,
        _plug: &Plug,
        _slot: &Slot,
    ) -> Result<()> {
        Ok(())
    }

    fn seccomp_connected_slot(
        &self,
        _spec: &mut Scope<'_, SecComp>,
        _plug: &Plug,
        _slot: &Slot,
    ) -> Result<()> {
        Ok(())
    }

    fn udev_permanent_plug(&self, _spec: &mut Scope<'_, UDev>, _plug: &Plug) -> Result<()> {
        Ok(())
    }

    fn udev_permanent_slot(&self, _spec: &mut Scope<'_, UDev>, _slot: &Slot) -> Result<()> {
        Ok(())
    }

    fn udev_connected_plug(
        &self,
        _spec: &mut Scope<'_, UDev>,
        _plug: &Plug,
        _slot: &Slot,
    ) -> Result<()> {
        Ok(())
    }

    fn udev_connected_slot(
        &self,
        _spec: &mut Scope<'_, UDev>,
        _plug: &Plug,
        _slot: &Slot,
    ) -> Result<()> {
        Ok(())
    }

    fn dbus_permanent_plug(&self, _spec: &mut Scope<'_, DBus>, _plug: &Plug) -> Result<()> {
        Ok(())
    }

    fn dbus_permanent_slot(&self, _spec: &mut Scope<'_, DBus>, _slot: &Slot) -> Result<()> {
        Ok(())
    }

    fn dbus_connected_plug(
        &self,
        _spec: &mut Scope<'_, DBus>,
        _plug: &Plug,
        _slot: &Slot,
    ) -> Result<()> {
        Ok(())
    }

    fn dbus_connected_slot(
        &self,
        _spec: &mut Scope<'_, DBus>,
        _plug: &Plug,
        _slot: &Slot,
    ) -> Result<()> {
        Ok(())
    }

    fn mount_permanent_plug(&self, _spec: &mut Scope<'_, Mount>, _plug: &Plug) -> Result<()> {
        Ok(())
    }

    fn mount_permanent_slot(&self, _spec: &mut Scope<'_, Mount>, _slot: &Slot) -> Result<()> {
        Ok(())
    }

    fn mount_connected_plug(
        &self,
        _spec: &mut Scope<'_, Mount>,
        _plug: &Plug,
        _slot: &Slot,
    ) -> Result<()> {
        Ok(())
    }

    fn mount_connected_slot(
        &self,
        _spec: &mut Scope<'_, Mount>,
        _plug: &Plug,
        _slot: &Slot,
    ) -> Result<()> {
        Ok(())
    }
}

/// Check that `plug` was routed to the interface called `name`.
pub fn ensure_plug(name: &str, plug: &Plug) -> Result<()> {
    if plug.interface != name {
        return Err(Error::Invariant(format!("plug {plug} is not of interface {name:?}")));
    }
    Ok(())
}

/// Check that `slot` was routed to the interface called `name`.
pub fn ensure_slot(name: &str, slot: &Slot) -> Result<()> {
    if slot.interface != name {
        return Err(Error::Invariant(format!("slot {slot} is not of interface {name:?}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Snap, SnapType};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Quiet;

    impl Interface for Quiet {
        fn name(&self) -> &'static str {
            "quiet"
        }

        fn auto_connect(&self, _plug: &Plug, _slot: &Slot) -> bool {
            false
        }
    }

    #[test]
    fn default_sanitize_checks_routing() {
        let snap = Arc::new(Snap::new("foo", SnapType::App).with_apps(["app"]));
        let mut good = Plug::new(snap.clone(), "quiet", "quiet");
        let mut bad = Plug::new(snap.clone(), "other", "other");
        let mut bad_slot = Slot::new(snap, "other", "other");

        assert!(Quiet.sanitize_plug(&mut good).is_ok());
        assert!(Quiet.sanitize_plug(&mut bad).unwrap_err().is_invariant_violation());
        assert!(Quiet.sanitize_slot(&mut bad_slot).unwrap_err().is_invariant_violation());
    }

    #[test]
    fn security_system_round_trips_through_str() {
        for system in SecuritySystem::ALL {
            assert_eq!(system.as_str().parse::<SecuritySystem>().unwrap(), system);
        }
        assert!("selinux".parse::<SecuritySystem>().is_err());
    }
}
