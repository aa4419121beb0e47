//! Loading a description of installed snaps and their connections.
//!
//! ```toml
//! [[snaps]]
//! name = "docker"
//! apps = ["app"]
//!
//! [snaps.plugs.docker]
//!
//! [[snaps]]
//! name = "core"
//! type = "os"
//!
//! [snaps.slots.docker-support]
//! interface = "docker-support"
//!
//! [[connections]]
//! plug = "docker:docker"
//! slot = "docker-support:docker"
//! ```

use crate::error::{Error, Result};
use interfaces::{
    Attributes, Connection, Plug, Registry, Rejected, Slot, Snap, SnapInfo, SnapType, sanitize_snap,
};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SystemFile {
    #[serde(default)]
    snaps: Vec<SnapEntry>,
    #[serde(default)]
    connections: Vec<ConnectionEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SnapEntry {
    name: String,
    #[serde(rename = "type", default)]
    snap_type: SnapType,
    publisher: Option<String>,
    #[serde(default)]
    apps: Vec<String>,
    #[serde(default)]
    plugs: BTreeMap<String, PlugEntry>,
    #[serde(default)]
    slots: BTreeMap<String, SlotEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct PlugEntry {
    interface: Option<String>,
    apps: Option<Vec<String>>,
    #[serde(flatten)]
    attrs: Attributes,
}

#[derive(Debug, Default, Deserialize)]
struct SlotEntry {
    interface: Option<String>,
    #[serde(flatten)]
    attrs: Attributes,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConnectionEntry {
    plug: String,
    slot: String,
}

/// Sanitized snaps and the connections between them.
#[derive(Debug, Default)]
pub struct System {
    pub snaps: Vec<SnapInfo>,
    pub connections: Vec<Connection>,
    /// Declarations refused by their interface.
    pub rejected: Vec<Rejected>,
}

impl System {
    /// Load and sanitize a system description file.
    pub fn load(path: impl AsRef<Path>, registry: &Registry) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::SystemNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, registry)
    }

    /// Parse and sanitize a system description.
    ///
    /// Declarations an interface refuses are dropped and listed in
    /// `rejected`, along with any connection that used them. A declaration
    /// naming an unknown interface fails the whole load.
    pub fn parse(toml: &str, registry: &Registry) -> Result<Self> {
        let file: SystemFile = toml::from_str(toml).map_err(|e| Error::System(e.to_string()))?;

        let mut system = System::default();
        let mut declared_plugs = BTreeSet::new();
        let mut declared_slots = BTreeSet::new();

        for entry in file.snaps {
            if system.snaps.iter().any(|info| info.name() == entry.name) {
                return Err(Error::System(format!("snap '{}' is listed twice", entry.name)));
            }
            for name in entry.plugs.keys() {
                declared_plugs.insert(format!("{}:{name}", entry.name));
            }
            for name in entry.slots.keys() {
                declared_slots.insert(format!("{}:{name}", entry.name));
            }

            let mut info = entry.into_info();
            let report = sanitize_snap(registry, &mut info)?;
            system.rejected.extend(report.rejected);
            debug!(
                snap = info.name(),
                plugs = info.plugs.len(),
                slots = info.slots.len(),
                "loaded snap"
            );
            system.snaps.push(info);
        }

        for entry in file.connections {
            let plug = match system.find_plug(&entry.plug)? {
                Some(plug) => plug,
                None if declared_plugs.contains(&entry.plug) => {
                    warn!(
                        plug = %entry.plug,
                        slot = %entry.slot,
                        "skipping connection to rejected plug"
                    );
                    continue;
                }
                None => {
                    return Err(Error::UndeclaredEndpoint {
                        kind: "plug",
                        reference: entry.plug,
                    });
                }
            };
            let slot = match system.find_slot(&entry.slot)? {
                Some(slot) => slot,
                None if declared_slots.contains(&entry.slot) => {
                    warn!(
                        plug = %entry.plug,
                        slot = %entry.slot,
                        "skipping connection to rejected slot"
                    );
                    continue;
                }
                None => {
                    return Err(Error::UndeclaredEndpoint {
                        kind: "slot",
                        reference: entry.slot,
                    });
                }
            };
            let conn = Connection::new(plug.clone(), slot.clone())?;
            system.connections.push(conn);
        }

        Ok(system)
    }

    fn find_plug(&self, reference: &str) -> Result<Option<&Plug>> {
        let (snap, name) = split_reference(reference)?;
        Ok(self
            .snaps
            .iter()
            .find(|info| info.name() == snap)
            .and_then(|info| info.plug(name)))
    }

    fn find_slot(&self, reference: &str) -> Result<Option<&Slot>> {
        let (snap, name) = split_reference(reference)?;
        Ok(self
            .snaps
            .iter()
            .find(|info| info.name() == snap)
            .and_then(|info| info.slot(name)))
    }
}

impl SnapEntry {
    fn into_info(self) -> SnapInfo {
        let mut snap = Snap::new(self.name, self.snap_type).with_apps(self.apps);
        if let Some(publisher) = self.publisher {
            snap = snap.with_publisher(publisher);
        }
        let mut info = SnapInfo::new(snap);

        for (name, entry) in self.plugs {
            let interface = entry.interface.unwrap_or_else(|| name.clone());
            let mut plug = Plug::new(info.snap.clone(), name, interface);
            if let Some(apps) = entry.apps {
                plug = plug.with_apps(apps);
            }
            plug.attrs = entry.attrs;
            info.plugs.push(plug);
        }
        for (name, entry) in self.slots {
            let interface = entry.interface.unwrap_or_else(|| name.clone());
            let mut slot = Slot::new(info.snap.clone(), name, interface);
            slot.attrs = entry.attrs;
            info.slots.push(slot);
        }
        info
    }
}

/// Split `snap:name`.
fn split_reference(reference: &str) -> Result<(&str, &str)> {
    match reference.split_once(':') {
        Some((snap, name)) if !snap.is_empty() && !name.is_empty() => Ok((snap, name)),
        _ => Err(Error::System(format!(
            "'{reference}' must have the form snap:name"
        ))),
    }
}
