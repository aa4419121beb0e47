//! Raw access to physical memory through `/dev/mem`.

use crate::common::sanitize_os_slot;
use interfaces::{Interface, Plug, Result, Slot, apparmor, udev};

const OBSERVE_CONNECTED_PLUG_APPARMOR: &str = r#"
# Description: With kernels with STRICT_DEVMEM=n, read-only access to all physical
# memory. With STRICT_DEVMEM=y, allow reading /dev/mem for read-only
# access to architecture-specific subset of the physical address (eg, PCI,
# space, BIOS code and data regions on x86, etc).
/dev/mem r,
"#;

const CONTROL_CONNECTED_PLUG_APPARMOR: &str = r#"
# Description: With kernels with STRICT_DEVMEM=n, write access to all physical
# memory. With STRICT_DEVMEM=y, allow writing to /dev/mem to access
# architecture-specific subset of the physical address (eg, PCI space,
# BIOS code and data regions on x86, etc) for all common uses of /dev/mem
# (eg, X without KMS, dosemu, dmidecode, lspci, etc).
/dev/mem rw,
"#;

const DEVICE: &str = "mem";

/// Read-only access to `/dev/mem`. Slots live on the core snap only.
#[derive(Debug, Default)]
pub struct PhysicalMemoryObserve;

impl Interface for PhysicalMemoryObserve {
    fn name(&self) -> &'static str {
        "physical-memory-observe"
    }

    fn sanitize_slot(&self, slot: &mut Slot) -> Result<()> {
        sanitize_os_slot(self.name(), slot)
    }

    fn auto_connect(&self, _plug: &Plug, _slot: &Slot) -> bool {
        // Declarations decide who may use it.
        true
    }

    fn apparmor_connected_plug(
        &self,
        spec: &mut apparmor::Scope<'_>,
        _plug: &Plug,
        _slot: &Slot,
    ) -> Result<()> {
        spec.add_snippet(OBSERVE_CONNECTED_PLUG_APPARMOR);
        Ok(())
    }

    fn udev_connected_plug(
        &self,
        spec: &mut udev::Scope<'_>,
        _plug: &Plug,
        _slot: &Slot,
    ) -> Result<()> {
        spec.tag_device(DEVICE)
    }
}

/// Read-write access to `/dev/mem`. Never connected automatically.
#[derive(Debug, Default)]
pub struct PhysicalMemoryControl;

impl Interface for PhysicalMemoryControl {
    fn name(&self) -> &'static str {
        "physical-memory-control"
    }

    fn sanitize_slot(&self, slot: &mut Slot) -> Result<()> {
        sanitize_os_slot(self.name(), slot)
    }

    fn auto_connect(&self, _plug: &Plug, _slot: &Slot) -> bool {
        false
    }

    fn apparmor_connected_plug(
        &self,
        spec: &mut apparmor::Scope<'_>,
        _plug: &Plug,
        _slot: &Slot,
    ) -> Result<()> {
        spec.add_snippet(CONTROL_CONNECTED_PLUG_APPARMOR);
        Ok(())
    }

    fn udev_connected_plug(
        &self,
        spec: &mut udev::Scope<'_>,
        _plug: &Plug,
        _slot: &Slot,
    ) -> Result<()> {
        spec.tag_device(DEVICE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::testing::{app_slot, os_slot, plug};
    use interfaces::Error;
    use proptest::prelude::*;

    #[test]
    fn names() {
        assert_eq!(PhysicalMemoryObserve.name(), "physical-memory-observe");
        assert_eq!(PhysicalMemoryControl.name(), "physical-memory-control");
    }

    #[test]
    fn slot_only_on_os_snap() {
        let iface = PhysicalMemoryObserve;
        assert!(iface.sanitize_slot(&mut os_slot(iface.name())).is_ok());

        let err = iface.sanitize_slot(&mut app_slot(iface.name())).unwrap_err();
        assert!(matches!(
            &err,
            Error::Sanitize { interface, .. } if interface == "physical-memory-observe"
        ));
        assert_eq!(
            err.to_string(),
            "physical-memory-observe: slots only allowed on core snap"
        );
    }

    #[test]
    fn plug_is_unconstrained() {
        let mut plug = plug("foo", &["app"], "physical-memory-observe");
        assert!(PhysicalMemoryObserve.sanitize_plug(&mut plug).is_ok());
    }

    #[test]
    fn misrouted_slot_is_an_invariant_violation() {
        let err = PhysicalMemoryObserve
            .sanitize_slot(&mut os_slot("docker"))
            .unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn observe_auto_connects_control_does_not() {
        let p = plug("foo", &["app"], "physical-memory-observe");
        let s = os_slot("physical-memory-observe");
        assert!(PhysicalMemoryObserve.auto_connect(&p, &s));

        let p = plug("foo", &["app"], "physical-memory-control");
        let s = os_slot("physical-memory-control");
        assert!(!PhysicalMemoryControl.auto_connect(&p, &s));
    }

    #[test]
    fn connected_plug_apparmor() {
        let p = plug("foo", &["app"], "physical-memory-observe");
        let s = os_slot("physical-memory-observe");
        let mut spec = apparmor::Specification::new();
        spec.add_connected_plug(&PhysicalMemoryObserve, &p, &s).unwrap();

        assert_eq!(spec.security_tags(), vec!["snap.foo.app"]);
        assert!(spec.snippet_for_tag("snap.foo.app").contains("/dev/mem r,\n"));
    }

    #[test]
    fn udev_rules_one_per_app() {
        let p = plug("foo", &["a", "b"], "physical-memory-observe");
        let s = os_slot("physical-memory-observe");
        let mut spec = udev::Specification::new();
        spec.add_connected_plug(&PhysicalMemoryObserve, &p, &s).unwrap();

        assert_eq!(spec.security_tags(), vec!["snap.foo.a", "snap.foo.b"]);
        assert_eq!(
            spec.snippet_for_tag("snap.foo.a"),
            "KERNEL==\"mem\", TAG+=\"snap.foo.a\"\n"
        );
        assert_eq!(
            spec.snippet_for_tag("snap.foo.b"),
            "KERNEL==\"mem\", TAG+=\"snap.foo.b\"\n"
        );
    }

    #[test]
    fn permanent_phases_contribute_nothing() {
        let p = plug("foo", &["app"], "physical-memory-observe");
        let s = os_slot("physical-memory-observe");
        let mut spec = apparmor::Specification::new();
        spec.add_permanent_plug(&PhysicalMemoryObserve, &p).unwrap();
        spec.add_permanent_slot(&PhysicalMemoryObserve, &s).unwrap();
        spec.add_connected_slot(&PhysicalMemoryObserve, &p, &s).unwrap();
        assert!(spec.is_empty());
    }

    proptest! {
        #[test]
        fn udev_emits_exactly_one_rule_per_app(
            apps in proptest::collection::btree_set("[a-z][a-z0-9]{0,6}", 1..6)
        ) {
            let apps: Vec<&str> = apps.iter().map(String::as_str).collect();
            let p = plug("foo", &apps, "physical-memory-observe");
            let s = os_slot("physical-memory-observe");
            let mut spec = udev::Specification::new();
            spec.add_connected_plug(&PhysicalMemoryObserve, &p, &s).unwrap();

            let rules: Vec<String> = spec
                .security_tags()
                .iter()
                .flat_map(|tag| spec.snippets(tag).cloned().collect::<Vec<_>>())
                .collect();
            prop_assert_eq!(rules.len(), apps.len());
            for app in &apps {
                let expected = format!("KERNEL==\"mem\", TAG+=\"snap.foo.{app}\"");
                prop_assert!(rules.contains(&expected));
            }
        }
    }
}
