//! Sharing files between snaps through bind mounts.
//!
//! The slot lists directories it offers (`read` and `write`); the plug names
//! a `target` inside its own snap where they appear. Paths start with one of
//! `$SNAP`, `$SNAP_DATA` or `$SNAP_COMMON`.

use interfaces::mount::MountEntry;
use interfaces::{
    Error, Interface, Plug, Result, Slot, Snap, apparmor, ensure_plug, ensure_slot, mount,
};
use serde_json::Value;
use std::collections::BTreeMap;

const CONTENT: &str = "content";
const TARGET: &str = "target";
const READ: &str = "read";
const WRITE: &str = "write";

/// Shared content between a producer and consumer snaps.
#[derive(Debug, Default)]
pub struct Content;

/// Expand a leading `$SNAP`-style variable against `snap`.
fn resolve(snap: &Snap, path: &str) -> Option<String> {
    let (base, rest) = if let Some(rest) = path.strip_prefix("$SNAP_DATA") {
        (format!("/var/snap/{}/current", snap.name), rest)
    } else if let Some(rest) = path.strip_prefix("$SNAP_COMMON") {
        (format!("/var/snap/{}/common", snap.name), rest)
    } else if let Some(rest) = path.strip_prefix("$SNAP") {
        (format!("/snap/{}/current", snap.name), rest)
    } else {
        return None;
    };
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }
    Some(format!("{base}{rest}"))
}

/// Last component of a resolved path; names the mount point below a target.
fn base_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or_default()
}

fn check_path(iface: &str, path: &str) -> Result<()> {
    let anchored = ["$SNAP", "$SNAP_DATA", "$SNAP_COMMON"]
        .iter()
        .any(|var| path == *var || path.starts_with(&format!("{var}/")));
    if !anchored {
        return Err(Error::sanitize(
            iface,
            format!("path {path:?} must start with $SNAP, $SNAP_DATA or $SNAP_COMMON"),
        ));
    }
    if path.split('/').any(|part| part == "..") {
        return Err(Error::sanitize(iface, format!("path {path:?} must not contain \"..\"")));
    }
    Ok(())
}

/// Read a list-of-paths attribute; absent means empty.
fn path_list(iface: &str, value: Option<&Value>, attr: &str) -> Result<Vec<String>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let items = value.as_array().ok_or_else(|| {
        Error::sanitize(iface, format!("{attr} attribute must be a list of paths"))
    })?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| {
                    Error::sanitize(iface, format!("{attr} entries must be strings, got {item}"))
                })
        })
        .collect()
}

/// Fill in `content` from the declaration name and require it to be a string.
fn default_content(iface: &str, attrs: &mut interfaces::Attributes, name: &str) -> Result<()> {
    match attrs.get(CONTENT) {
        None => {
            attrs.insert(CONTENT.to_string(), Value::String(name.to_string()));
            Ok(())
        }
        Some(Value::String(_)) => Ok(()),
        Some(other) => Err(Error::sanitize(
            iface,
            format!("{CONTENT} attribute must be a string, got {other}"),
        )),
    }
}

impl Interface for Content {
    fn name(&self) -> &'static str {
        "content"
    }

    fn sanitize_plug(&self, plug: &mut Plug) -> Result<()> {
        ensure_plug(self.name(), plug)?;
        let name = plug.name.clone();
        default_content(self.name(), &mut plug.attrs, &name)?;

        let target = plug
            .attr_str(TARGET)
            .ok_or_else(|| Error::sanitize(self.name(), "content plug must contain target path"))?;
        check_path(self.name(), target)
    }

    fn sanitize_slot(&self, slot: &mut Slot) -> Result<()> {
        ensure_slot(self.name(), slot)?;
        let name = slot.name.clone();
        default_content(self.name(), &mut slot.attrs, &name)?;

        let read = path_list(self.name(), slot.attr(READ), READ)?;
        let write = path_list(self.name(), slot.attr(WRITE), WRITE)?;
        if read.is_empty() && write.is_empty() {
            return Err(Error::sanitize(
                self.name(),
                "read or write path must be set",
            ));
        }
        let mut bases = BTreeMap::new();
        for path in read.iter().chain(&write) {
            check_path(self.name(), path)?;
            let source = resolve(&slot.snap, path).unwrap_or_default();
            let base = base_name(&source).to_string();
            if let Some(first) = bases.insert(base.clone(), path) {
                return Err(Error::sanitize(
                    self.name(),
                    format!("paths {first:?} and {path:?} share the name {base:?}"),
                ));
            }
        }
        Ok(())
    }

    fn auto_connect(&self, plug: &Plug, slot: &Slot) -> bool {
        match (plug.attr_str(CONTENT), slot.attr_str(CONTENT)) {
            (Some(wanted), Some(offered)) => wanted == offered,
            _ => false,
        }
    }

    fn apparmor_connected_plug(
        &self,
        spec: &mut apparmor::Scope<'_>,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<()> {
        if path_list(self.name(), slot.attr(WRITE), WRITE)?.is_empty() {
            return Ok(());
        }
        let target = self.target(plug)?;
        spec.add_snippet(format!(
            "# Description: write access to content shared by {}\n{target}/** mrwklix,",
            slot.snap.name
        ));
        Ok(())
    }

    fn mount_connected_plug(
        &self,
        spec: &mut mount::Scope<'_>,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<()> {
        let target = self.target(plug)?;
        let read = path_list(self.name(), slot.attr(READ), READ)?;
        let write = path_list(self.name(), slot.attr(WRITE), WRITE)?;
        let single = read.len() + write.len() == 1;

        let shared = read.iter().map(|p| (p, true)).chain(write.iter().map(|p| (p, false)));
        for (path, read_only) in shared {
            let source = resolve(&slot.snap, path).ok_or_else(|| {
                Error::sanitize(self.name(), format!("cannot resolve slot path {path:?}"))
            })?;
            let dir = if single {
                target.clone()
            } else {
                format!("{target}/{}", base_name(&source))
            };
            spec.add_mount_entry(MountEntry::bind(source, dir, read_only));
        }
        Ok(())
    }
}

impl Content {
    fn target(&self, plug: &Plug) -> Result<String> {
        plug.attr_str(TARGET)
            .and_then(|target| resolve(&plug.snap, target))
            .ok_or_else(|| {
                Error::sanitize(self.name(), format!("plug {plug} has no usable target"))
            })
    }
}
