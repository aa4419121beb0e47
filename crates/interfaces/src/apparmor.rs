//! Mandatory-access-control (AppArmor) backend.

use crate::specification::{self, SecurityBackend};
use crate::{Interface, Plug, Result, SecuritySystem, Slot};
use indexmap::IndexSet;

/// Marker for the AppArmor backend.
#[derive(Debug)]
pub struct AppArmor;

pub type Specification = specification::Specification<AppArmor>;
pub type Scope<'a> = specification::Scope<'a, AppArmor>;

impl SecurityBackend for AppArmor {
    const SYSTEM: SecuritySystem = SecuritySystem::AppArmor;
    type Item = String;

    fn permanent_plug(iface: &dyn Interface, scope: &mut Scope<'_>, plug: &Plug) -> Result<()> {
        iface.apparmor_permanent_plug(scope, plug)
    }

    fn permanent_slot(iface: &dyn Interface, scope: &mut Scope<'_>, slot: &Slot) -> Result<()> {
        iface.apparmor_permanent_slot(scope, slot)
    }

    fn connected_plug(
        iface: &dyn Interface,
        scope: &mut Scope<'_>,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<()> {
        iface.apparmor_connected_plug(scope, plug, slot)
    }

    fn connected_slot(
        iface: &dyn Interface,
        scope: &mut Scope<'_>,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<()> {
        iface.apparmor_connected_slot(scope, plug, slot)
    }

    fn snippet(items: &IndexSet<String>) -> String {
        specification::join_lines(items)
    }

    fn profile(tag: &str, items: &IndexSet<String>) -> String {
        let mut out = String::from("#include <tunables/global>\n\n");
        out.push_str(&format!("profile \"{tag}\" (attach_disconnected,mediate_deleted) {{\n"));
        out.push_str("  #include <abstractions/base>\n\n");
        for line in Self::snippet(items).lines() {
            if line.is_empty() {
                out.push('\n');
            } else {
                out.push_str("  ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push_str("}\n");
        out
    }
}
