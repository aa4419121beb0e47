//! Checks shared by several interfaces.

use interfaces::{Error, Result, Slot, SnapType, ensure_slot};

/// Accept the slot only when its snap is the operating-system snap.
pub(crate) fn sanitize_os_slot(name: &'static str, slot: &Slot) -> Result<()> {
    ensure_slot(name, slot)?;
    if slot.snap.snap_type != SnapType::Os {
        return Err(Error::sanitize(name, "slots only allowed on core snap"));
    }
    Ok(())
}
