//! Driving every backend for a set of snaps and connections.

use crate::apparmor::AppArmor;
use crate::dbus::DBus;
use crate::mount::Mount;
use crate::seccomp::SecComp;
use crate::specification::{SecurityBackend, Specification};
use crate::udev::UDev;
use crate::{Connection, Error, Registry, Result, SecuritySystem, SnapInfo};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Output of one backend for one compile cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledBackend {
    pub system: SecuritySystem,
    /// Complete backend file per security tag.
    pub profiles: BTreeMap<String, String>,
    /// Tags whose policy could not be built, with the reason.
    pub failures: BTreeMap<String, String>,
}

impl CompiledBackend {
    pub fn security_tags(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }
}

/// Feeds declarations and connections into fresh Specifications.
///
/// Snaps are expected to have been sanitized already. Producer failures are
/// confined to the tags they affect; invariant violations, malformed snap or
/// app names and unknown interfaces abort the whole compile.
pub struct Compiler<'a> {
    registry: &'a Registry,
}

impl<'a> Compiler<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Compile one backend.
    pub fn compile<B: SecurityBackend>(
        &self,
        snaps: &[SnapInfo],
        connections: &[Connection],
    ) -> Result<CompiledBackend> {
        let mut spec = Specification::<B>::new();
        let mut failures = BTreeMap::new();

        for info in snaps {
            info.snap.validate()?;
        }
        for conn in connections {
            conn.plug().snap.validate()?;
            conn.slot().snap.validate()?;
        }

        for info in snaps {
            for plug in &info.plugs {
                let iface = self.registry.lookup(&plug.interface)?;
                absorb(spec.add_permanent_plug(iface, plug), &mut failures)?;
            }
            for slot in &info.slots {
                let iface = self.registry.lookup(&slot.interface)?;
                absorb(spec.add_permanent_slot(iface, slot), &mut failures)?;
            }
        }

        for conn in connections {
            let iface = self.registry.lookup(conn.interface())?;
            absorb(
                spec.add_connected_plug(iface, conn.plug(), conn.slot()),
                &mut failures,
            )?;
            absorb(
                spec.add_connected_slot(iface, conn.plug(), conn.slot()),
                &mut failures,
            )?;
        }

        let profiles: BTreeMap<String, String> = spec
            .security_tags()
            .into_iter()
            .filter(|tag| !failures.contains_key(tag))
            .filter_map(|tag| spec.profile_for_tag(&tag).map(|profile| (tag, profile)))
            .collect();

        info!(
            backend = %B::SYSTEM,
            profiles = profiles.len(),
            failures = failures.len(),
            "compiled backend"
        );
        Ok(CompiledBackend {
            system: B::SYSTEM,
            profiles,
            failures,
        })
    }

    /// Compile the backend named by `system`.
    pub fn compile_system(
        &self,
        system: SecuritySystem,
        snaps: &[SnapInfo],
        connections: &[Connection],
    ) -> Result<CompiledBackend> {
        match system {
            SecuritySystem::AppArmor => self.compile::<AppArmor>(snaps, connections),
            SecuritySystem::SecComp => self.compile::<SecComp>(snaps, connections),
            SecuritySystem::UDev => self.compile::<UDev>(snaps, connections),
            SecuritySystem::DBus => self.compile::<DBus>(snaps, connections),
            SecuritySystem::Mount => self.compile::<Mount>(snaps, connections),
        }
    }

    /// Compile every backend, each from its own Specification.
    pub fn compile_all(
        &self,
        snaps: &[SnapInfo],
        connections: &[Connection],
    ) -> Result<Vec<CompiledBackend>> {
        SecuritySystem::ALL
            .into_iter()
            .map(|system| self.compile_system(system, snaps, connections))
            .collect()
    }
}

/// Record a tag-scoped failure, or pass through anything fatal.
fn absorb(outcome: Result<()>, failures: &mut BTreeMap<String, String>) -> Result<()> {
    match outcome {
        Ok(()) => Ok(()),
        Err(Error::Snippet {
            backend,
            tags,
            reason,
        }) => {
            if tags.is_empty() {
                warn!(
                    backend = %backend,
                    reason = %reason,
                    "producer failed with no tags in scope"
                );
            }
            for tag in tags {
                warn!(backend = %backend, tag = %tag, reason = %reason, "dropping policy for tag");
                failures.entry(tag).or_insert_with(|| reason.clone());
            }
            Ok(())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specification::Scope;
    use crate::{Interface, Plug, Slot, Snap, SnapType};

    /// Emits an over-long seccomp line for plugs named `broken` and fails
    /// outright for plugs named `refused`.
    #[derive(Debug)]
    struct Sometimes;

    impl Interface for Sometimes {
        fn name(&self) -> &'static str {
            "sometimes"
        }

        fn auto_connect(&self, _plug: &Plug, _slot: &Slot) -> bool {
            true
        }

        fn seccomp_connected_plug(
            &self,
            spec: &mut Scope<'_, SecComp>,
            plug: &Plug,
            _slot: &Slot,
        ) -> Result<()> {
            if plug.name == "refused" {
                return Err(Error::sanitize(self.name(), "refused"));
            }
            if plug.name == "broken" {
                spec.add_snippet("x".repeat(200));
            } else {
                spec.add_snippet("bind");
            }
            Ok(())
        }
    }

    #[test]
    fn failures_stay_with_their_tags() {
        let registry = Registry::new([Box::new(Sometimes) as Box<dyn Interface>]).unwrap();
        let core = SnapInfo::new(Snap::new("core", SnapType::Os));
        let slot = Slot::new(core.snap.clone(), "sometimes", "sometimes");

        let good = SnapInfo::new(Snap::new("good", SnapType::App).with_apps(["app"]));
        let bad = SnapInfo::new(Snap::new("bad", SnapType::App).with_apps(["app"]));
        let connections = vec![
            Connection::new(
                Plug::new(good.snap.clone(), "fine", "sometimes"),
                slot.clone(),
            )
            .unwrap(),
            Connection::new(Plug::new(bad.snap.clone(), "broken", "sometimes"), slot).unwrap(),
        ];

        let compiled = Compiler::new(&registry)
            .compile::<SecComp>(&[core, good, bad], &connections)
            .unwrap();

        assert_eq!(compiled.security_tags(), vec!["snap.good.app"]);
        assert!(compiled.profiles["snap.good.app"].contains("bind\n"));
        assert!(compiled.failures.contains_key("snap.bad.app"));
    }

    #[test]
    fn failure_without_tags_drops_nothing() {
        let registry = Registry::new([Box::new(Sometimes) as Box<dyn Interface>]).unwrap();
        let core = SnapInfo::new(Snap::new("core", SnapType::Os));
        let slot = Slot::new(core.snap.clone(), "sometimes", "sometimes");
        let app = SnapInfo::new(Snap::new("app", SnapType::App).with_apps(["app"]));
        let unbound =
            Plug::new(app.snap.clone(), "refused", "sometimes").with_apps(Vec::<String>::new());
        let connections = vec![Connection::new(unbound, slot).unwrap()];

        let compiled = Compiler::new(&registry)
            .compile::<SecComp>(&[core, app], &connections)
            .unwrap();

        assert!(compiled.failures.is_empty());
        assert!(compiled.profiles.is_empty());
    }

    #[test]
    fn malformed_snap_name_aborts() {
        let registry = Registry::new([Box::new(Sometimes) as Box<dyn Interface>]).unwrap();
        let info = SnapInfo::new(Snap::new("evil", SnapType::App).with_apps(["a/../b"]));

        let err = Compiler::new(&registry).compile::<SecComp>(&[info], &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidName { kind: "app", .. }));
    }

    #[test]
    fn unknown_interface_aborts() {
        let registry = Registry::default();
        let mut info = SnapInfo::new(Snap::new("foo", SnapType::App).with_apps(["app"]));
        info.plugs.push(Plug::new(info.snap.clone(), "x", "x"));

        let err = Compiler::new(&registry).compile_all(&[info], &[]).unwrap_err();
        assert!(matches!(err, Error::UnknownInterface(_)));
    }
}
