//! Bus-policy (D-Bus) backend.

use crate::specification::{self, SecurityBackend};
use crate::{Interface, Plug, Result, SecuritySystem, Slot};
use indexmap::IndexSet;

/// Marker for the D-Bus policy backend.
#[derive(Debug)]
pub struct DBus;

pub type Specification = specification::Specification<DBus>;
pub type Scope<'a> = specification::Scope<'a, DBus>;

const POLICY_HEADER: &str = r#"<!DOCTYPE busconfig PUBLIC
 "-//freedesktop//DTD D-BUS Bus Configuration 1.0//EN"
 "http://www.freedesktop.org/standards/dbus/1.0/busconfig.dtd">
<busconfig>
"#;

impl SecurityBackend for DBus {
    const SYSTEM: SecuritySystem = SecuritySystem::DBus;
    type Item = String;

    fn permanent_plug(iface: &dyn Interface, scope: &mut Scope<'_>, plug: &Plug) -> Result<()> {
        iface.dbus_permanent_plug(scope, plug)
    }

    fn permanent_slot(iface: &dyn Interface, scope: &mut Scope<'_>, slot: &Slot) -> Result<()> {
        iface.dbus_permanent_slot(scope, slot)
    }

    fn connected_plug(
        iface: &dyn Interface,
        scope: &mut Scope<'_>,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<()> {
        iface.dbus_connected_plug(scope, plug, slot)
    }

    fn connected_slot(
        iface: &dyn Interface,
        scope: &mut Scope<'_>,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<()> {
        iface.dbus_connected_slot(scope, plug, slot)
    }

    fn validate(item: &String) -> std::result::Result<(), String> {
        let trimmed = item.trim();
        if !trimmed.starts_with('<') || !trimmed.ends_with('>') {
            return Err(format!("bus policy fragment is not an XML element: {trimmed:?}"));
        }
        Ok(())
    }

    fn snippet(items: &IndexSet<String>) -> String {
        specification::join_lines(items)
    }

    fn profile(_tag: &str, items: &IndexSet<String>) -> String {
        let mut out = String::from(POLICY_HEADER);
        out.push_str(&Self::snippet(items));
        out.push_str("</busconfig>\n");
        out
    }
}
