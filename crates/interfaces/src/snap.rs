//! Snaps, plugs, slots and connections.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Interface-specific attributes attached to a plug or slot.
pub type Attributes = BTreeMap<String, Value>;

/// Build the process-identity tag for one app of a snap.
pub fn security_tag(snap: &str, app: &str) -> String {
    format!("snap.{snap}.{app}")
}

/// Check a snap, plug or slot name: lowercase letters and digits in
/// hyphen-separated runs, e.g. `docker-support`.
pub fn validate_snap_name(name: &str) -> Result<()> {
    validate_name("snap", name, |c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Check an app name: letters and digits in hyphen-separated runs.
pub fn validate_app_name(name: &str) -> Result<()> {
    validate_name("app", name, |c| c.is_ascii_alphanumeric())
}

fn validate_name(kind: &'static str, name: &str, allowed: impl Fn(char) -> bool) -> Result<()> {
    let valid = name
        .split('-')
        .all(|run| !run.is_empty() && run.chars().all(&allowed));
    if !valid {
        return Err(Error::InvalidName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Kind of snap, as declared in its metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapType {
    #[default]
    App,
    #[serde(alias = "core")]
    Os,
    Gadget,
    Kernel,
    Base,
}

impl SnapType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapType::App => "app",
            SnapType::Os => "os",
            SnapType::Gadget => "gadget",
            SnapType::Kernel => "kernel",
            SnapType::Base => "base",
        }
    }
}

impl fmt::Display for SnapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an installed snap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snap {
    pub name: String,
    pub snap_type: SnapType,
    pub publisher: Option<String>,
    pub apps: BTreeSet<String>,
}

impl Snap {
    pub fn new(name: impl Into<String>, snap_type: SnapType) -> Self {
        Self {
            name: name.into(),
            snap_type,
            publisher: None,
            apps: BTreeSet::new(),
        }
    }

    pub fn with_apps(mut self, apps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.apps = apps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    /// Check the snap name and every app name.
    ///
    /// Names end up verbatim in security tags, rule files and file names,
    /// so nothing else may be done with a snap that fails this.
    pub fn validate(&self) -> Result<()> {
        validate_snap_name(&self.name)?;
        self.apps.iter().try_for_each(|app| validate_app_name(app))
    }

    /// Tag shared by every app of the snap; per-snap backends key on it.
    pub fn snap_tag(&self) -> String {
        format!("snap.{}", self.name)
    }

    /// Security tags of every app in the snap, sorted.
    pub fn app_tags(&self) -> Vec<String> {
        self.apps
            .iter()
            .map(|app| security_tag(&self.name, app))
            .collect()
    }
}

/// A capability consumption point declared by a snap.
#[derive(Debug, Clone, PartialEq)]
pub struct Plug {
    pub snap: Arc<Snap>,
    pub name: String,
    pub interface: String,
    pub attrs: Attributes,
    /// Apps bound to this plug; each contributes one security tag.
    pub apps: BTreeSet<String>,
}

impl Plug {
    /// Create a plug bound to every app of its snap.
    pub fn new(snap: Arc<Snap>, name: impl Into<String>, interface: impl Into<String>) -> Self {
        let apps = snap.apps.clone();
        Self {
            snap,
            name: name.into(),
            interface: interface.into(),
            attrs: Attributes::new(),
            apps,
        }
    }

    pub fn with_apps(mut self, apps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.apps = apps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    pub fn security_tags(&self) -> Vec<String> {
        self.apps
            .iter()
            .map(|app| security_tag(&self.snap.name, app))
            .collect()
    }
}

impl fmt::Display for Plug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.snap.name, self.name)
    }
}

/// A capability provision point declared by a snap.
///
/// Slots carry no app list: every app of the hosting snap receives
/// slot-side policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub snap: Arc<Snap>,
    pub name: String,
    pub interface: String,
    pub attrs: Attributes,
}

impl Slot {
    pub fn new(snap: Arc<Snap>, name: impl Into<String>, interface: impl Into<String>) -> Self {
        Self {
            snap,
            name: name.into(),
            interface: interface.into(),
            attrs: Attributes::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    pub fn security_tags(&self) -> Vec<String> {
        self.snap.app_tags()
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.snap.name, self.name)
    }
}

/// An established pairing of one plug with one slot of the same interface.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    plug: Plug,
    slot: Slot,
}

impl Connection {
    /// Pair `plug` with `slot`, rejecting mismatched interfaces.
    pub fn new(plug: Plug, slot: Slot) -> Result<Self> {
        if plug.interface != slot.interface {
            return Err(Error::InterfaceMismatch {
                plug: plug.to_string(),
                plug_interface: plug.interface,
                slot: slot.to_string(),
                slot_interface: slot.interface,
            });
        }
        Ok(Self { plug, slot })
    }

    pub fn plug(&self) -> &Plug {
        &self.plug
    }

    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    pub fn interface(&self) -> &str {
        &self.plug.interface
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.plug, self.slot)
    }
}

/// A snap together with the plugs and slots it declares.
#[derive(Debug, Clone)]
pub struct SnapInfo {
    pub snap: Arc<Snap>,
    pub plugs: Vec<Plug>,
    pub slots: Vec<Slot>,
}

impl SnapInfo {
    pub fn new(snap: Snap) -> Self {
        Self {
            snap: Arc::new(snap),
            plugs: Vec::new(),
            slots: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.snap.name
    }

    pub fn plug(&self, name: &str) -> Option<&Plug> {
        self.plugs.iter().find(|p| p.name == name)
    }

    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.name == name)
    }
}
