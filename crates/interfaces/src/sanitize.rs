//! Install-time validation of declared plugs and slots.
//!
//! Each plug and slot is checked on its own against the interface it names;
//! nothing here looks at the other side of a would-be connection, so the
//! order in which declarations are sanitized does not matter.

use crate::{Error, Plug, Registry, Result, Slot, SnapInfo, validate_snap_name};
use tracing::warn;

/// Validate a single plug against its interface.
pub fn sanitize_plug(registry: &Registry, plug: &mut Plug) -> Result<()> {
    let iface = registry.lookup(&plug.interface)?;
    if validate_snap_name(&plug.name).is_err() {
        return Err(Error::sanitize(iface.name(), format!("invalid plug name {:?}", plug.name)));
    }
    if let Some(app) = plug.apps.iter().find(|app| !plug.snap.apps.contains(*app)) {
        return Err(Error::sanitize(
            iface.name(),
            format!("plug {plug} is bound to unknown app {app:?}"),
        ));
    }
    iface.sanitize_plug(plug)
}

/// Validate a single slot against its interface.
pub fn sanitize_slot(registry: &Registry, slot: &mut Slot) -> Result<()> {
    let iface = registry.lookup(&slot.interface)?;
    if validate_snap_name(&slot.name).is_err() {
        return Err(Error::sanitize(iface.name(), format!("invalid slot name {:?}", slot.name)));
    }
    iface.sanitize_slot(slot)
}

/// A plug or slot dropped during sanitization.
#[derive(Debug)]
pub struct Rejected {
    /// `snap:name` of the declaration.
    pub declaration: String,
    pub interface: String,
    pub error: Error,
}

/// Outcome of sanitizing every declaration of a snap.
#[derive(Debug, Default)]
pub struct SanitizeReport {
    pub rejected: Vec<Rejected>,
}

impl SanitizeReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Sanitize every plug and slot of a snap.
///
/// A malformed snap or app name, or a declaration naming an unknown
/// interface, rejects the whole snap. Declarations their interface refuses
/// are removed from `info` and listed in the report; the remaining ones stay
/// usable. Invariant violations abort.
pub fn sanitize_snap(registry: &Registry, info: &mut SnapInfo) -> Result<SanitizeReport> {
    info.snap.validate()?;

    let unknown = info
        .plugs
        .iter()
        .map(|p| p.interface.as_str())
        .chain(info.slots.iter().map(|s| s.interface.as_str()))
        .find(|name| registry.get(name).is_none());
    if let Some(name) = unknown {
        return Err(Error::UnknownInterface(name.to_string()));
    }

    let mut report = SanitizeReport::default();

    let mut kept = Vec::with_capacity(info.plugs.len());
    for mut plug in std::mem::take(&mut info.plugs) {
        match sanitize_plug(registry, &mut plug) {
            Ok(()) => kept.push(plug),
            Err(err) if err.is_invariant_violation() => return Err(err),
            Err(err) => {
                warn!(plug = %plug, interface = %plug.interface, error = %err, "plug rejected");
                report.rejected.push(Rejected {
                    declaration: plug.to_string(),
                    interface: plug.interface.clone(),
                    error: err,
                });
            }
        }
    }
    info.plugs = kept;

    let mut kept = Vec::with_capacity(info.slots.len());
    for mut slot in std::mem::take(&mut info.slots) {
        match sanitize_slot(registry, &mut slot) {
            Ok(()) => kept.push(slot),
            Err(err) if err.is_invariant_violation() => return Err(err),
            Err(err) => {
                warn!(slot = %slot, interface = %slot.interface, error = %err, "slot rejected");
                report.rejected.push(Rejected {
                    declaration: slot.to_string(),
                    interface: slot.interface.clone(),
                    error: err,
                });
            }
        }
    }
    info.slots = kept;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Interface, Snap, SnapType};

    /// Slots only on os snaps; plugs must carry a `path` attribute.
    #[derive(Debug)]
    struct Picky;

    impl Interface for Picky {
        fn name(&self) -> &'static str {
            "picky"
        }

        fn sanitize_plug(&self, plug: &mut Plug) -> Result<()> {
            crate::ensure_plug(self.name(), plug)?;
            if plug.attr_str("path").is_none() {
                return Err(Error::sanitize(self.name(), "plug needs a path"));
            }
            Ok(())
        }

        fn sanitize_slot(&self, slot: &mut Slot) -> Result<()> {
            crate::ensure_slot(self.name(), slot)?;
            if slot.snap.snap_type != SnapType::Os {
                return Err(Error::sanitize(self.name(), "slots only allowed on core snap"));
            }
            Ok(())
        }

        fn auto_connect(&self, _plug: &Plug, _slot: &Slot) -> bool {
            false
        }
    }

    fn registry() -> Registry {
        Registry::new([Box::new(Picky) as Box<dyn Interface>]).unwrap()
    }

    #[test]
    fn rejected_declarations_are_removed() {
        let mut info = SnapInfo::new(Snap::new("foo", SnapType::App).with_apps(["app"]));
        let snap = info.snap.clone();
        info.plugs.push(Plug::new(snap.clone(), "good", "picky").with_attr("path", "/x"));
        info.plugs.push(Plug::new(snap.clone(), "bad", "picky"));
        info.slots.push(Slot::new(snap, "slot", "picky"));

        let report = sanitize_snap(&registry(), &mut info).unwrap();

        assert_eq!(info.plugs.len(), 1);
        assert_eq!(info.plugs[0].name, "good");
        assert!(info.slots.is_empty());
        assert_eq!(report.rejected.len(), 2);
        assert_eq!(report.rejected[0].declaration, "foo:bad");
        assert_eq!(
            report.rejected[1].error.to_string(),
            "picky: slots only allowed on core snap"
        );
    }

    #[test]
    fn unknown_interface_rejects_the_snap() {
        let mut info = SnapInfo::new(Snap::new("foo", SnapType::App));
        let snap = info.snap.clone();
        info.plugs.push(Plug::new(snap, "mystery", "mystery"));

        let err = sanitize_snap(&registry(), &mut info).unwrap_err();
        assert!(matches!(err, Error::UnknownInterface(name) if name == "mystery"));
    }

    #[test]
    fn malformed_app_name_rejects_the_snap() {
        let snap = Snap::new("foo", SnapType::App).with_apps([r#"x", MODE="0666"#]);
        let mut info = SnapInfo::new(snap);
        let plug = Plug::new(info.snap.clone(), "p", "picky").with_attr("path", "/x");
        info.plugs.push(plug);

        let err = sanitize_snap(&registry(), &mut info).unwrap_err();
        assert!(matches!(err, Error::InvalidName { kind: "app", .. }));
    }

    #[test]
    fn malformed_declaration_name_is_rejected() {
        let mut info = SnapInfo::new(Snap::new("foo", SnapType::App).with_apps(["app"]));
        let snap = info.snap.clone();
        info.plugs.push(Plug::new(snap.clone(), "ok", "picky").with_attr("path", "/x"));
        info.plugs.push(Plug::new(snap, "../p", "picky").with_attr("path", "/x"));

        let report = sanitize_snap(&registry(), &mut info).unwrap();
        assert_eq!(info.plugs.len(), 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(
            report.rejected[0].error.to_string(),
            r#"picky: invalid plug name "../p""#
        );
    }

    #[test]
    fn plug_bound_to_missing_app_is_rejected() {
        let snap = std::sync::Arc::new(Snap::new("foo", SnapType::App).with_apps(["app"]));
        let mut plug = Plug::new(snap, "p", "picky")
            .with_attr("path", "/x")
            .with_apps(["ghost"]);

        let err = sanitize_plug(&registry(), &mut plug).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn order_does_not_matter() {
        let core = std::sync::Arc::new(Snap::new("core", SnapType::Os));
        let app = std::sync::Arc::new(Snap::new("foo", SnapType::App).with_apps(["app"]));
        let registry = registry();

        let mut slot_first = Slot::new(core.clone(), "s", "picky");
        let mut plug_second = Plug::new(app.clone(), "p", "picky").with_attr("path", "/x");
        assert!(sanitize_slot(&registry, &mut slot_first).is_ok());
        assert!(sanitize_plug(&registry, &mut plug_second).is_ok());

        let mut plug_first = Plug::new(app, "p", "picky").with_attr("path", "/x");
        let mut slot_second = Slot::new(core, "s", "picky");
        assert!(sanitize_plug(&registry, &mut plug_first).is_ok());
        assert!(sanitize_slot(&registry, &mut slot_second).is_ok());
    }
}
