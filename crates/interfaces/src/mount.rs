//! Per-snap mount namespace backend.
//!
//! Mount policy is kept per snap rather than per app: every app of a snap
//! shares one mount namespace, so fragments are keyed by `snap.<name>`.
//! Profiles are fstab-style text, one [`MountEntry`] per line, sorted.

use crate::specification::{self, SecurityBackend};
use crate::{Error, Interface, Plug, Result, SecuritySystem, Slot};
use indexmap::IndexSet;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;

/// Marker for the mount backend.
#[derive(Debug)]
pub struct Mount;

pub type Specification = specification::Specification<Mount>;
pub type Scope<'a> = specification::Scope<'a, Mount>;

impl Scope<'_> {
    pub fn add_mount_entry(&mut self, entry: MountEntry) {
        self.add(entry);
    }
}

/// One line of a mount profile.
///
/// The derived ordering compares fields in declaration order, which is the
/// order profiles are written in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MountEntry {
    pub fsname: String,
    pub dir: String,
    pub fstype: String,
    pub options: String,
    pub freq: u32,
    pub passno: u32,
}

impl MountEntry {
    /// A bind mount of `source` onto `target`.
    pub fn bind(source: impl Into<String>, target: impl Into<String>, read_only: bool) -> Self {
        Self {
            fsname: source.into(),
            dir: target.into(),
            fstype: "none".to_string(),
            options: if read_only { "bind,ro" } else { "bind" }.to_string(),
            freq: 0,
            passno: 0,
        }
    }

    /// Parse one fstab-style line. `freq` and `passno` default to zero.
    pub fn parse(text: &str, line: usize) -> Result<Self> {
        let fields: Vec<&str> = text.split_whitespace().collect();
        if !(4..=6).contains(&fields.len()) {
            return Err(Error::MountProfile {
                line,
                reason: format!("expected 4 to 6 fields, found {}", fields.len()),
            });
        }
        let number = |index: usize, name: &str| -> Result<u32> {
            match fields.get(index) {
                None => Ok(0),
                Some(raw) => raw.parse().map_err(|_| Error::MountProfile {
                    line,
                    reason: format!("{name} is not a number: {raw:?}"),
                }),
            }
        };

        Ok(Self {
            fsname: unescape(fields[0]),
            dir: unescape(fields[1]),
            fstype: unescape(fields[2]),
            options: unescape(fields[3]),
            freq: number(4, "freq")?,
            passno: number(5, "passno")?,
        })
    }
}

impl fmt::Display for MountEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            escape(&self.fsname),
            escape(&self.dir),
            escape(&self.fstype),
            escape(&self.options),
            self.freq,
            self.passno
        )
    }
}

/// An ordered list of mount entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountProfile {
    pub entries: Vec<MountEntry>,
}

impl MountProfile {
    /// Parse profile text. Empty text yields an empty profile.
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            entries.push(MountEntry::parse(trimmed, index + 1)?);
        }
        Ok(Self { entries })
    }

    /// Read a profile file. A file that does not exist is an empty profile.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(text) => Self::parse(&text),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn sort(&mut self) {
        self.entries.sort();
    }

    /// Render one entry per line, in the current order.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        out
    }
}

impl FromIterator<MountEntry> for MountProfile {
    fn from_iter<I: IntoIterator<Item = MountEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl SecurityBackend for Mount {
    const SYSTEM: SecuritySystem = SecuritySystem::Mount;
    type Item = MountEntry;

    fn plug_tags(plug: &Plug) -> Vec<String> {
        vec![plug.snap.snap_tag()]
    }

    fn slot_tags(slot: &Slot) -> Vec<String> {
        vec![slot.snap.snap_tag()]
    }

    fn permanent_plug(iface: &dyn Interface, scope: &mut Scope<'_>, plug: &Plug) -> Result<()> {
        iface.mount_permanent_plug(scope, plug)
    }

    fn permanent_slot(iface: &dyn Interface, scope: &mut Scope<'_>, slot: &Slot) -> Result<()> {
        iface.mount_permanent_slot(scope, slot)
    }

    fn connected_plug(
        iface: &dyn Interface,
        scope: &mut Scope<'_>,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<()> {
        iface.mount_connected_plug(scope, plug, slot)
    }

    fn connected_slot(
        iface: &dyn Interface,
        scope: &mut Scope<'_>,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<()> {
        iface.mount_connected_slot(scope, plug, slot)
    }

    fn validate(entry: &MountEntry) -> std::result::Result<(), String> {
        if entry.fsname.is_empty() || entry.dir.is_empty() {
            return Err("mount entry needs both a source and a target".to_string());
        }
        if !entry.dir.starts_with('/') {
            return Err(format!("mount target {:?} is not absolute", entry.dir));
        }
        Ok(())
    }

    fn snippet(items: &IndexSet<MountEntry>) -> String {
        let mut profile: MountProfile = items.iter().cloned().collect();
        profile.sort();
        profile.render()
    }

    fn profile(_tag: &str, items: &IndexSet<MountEntry>) -> String {
        Self::snippet(items)
    }
}

/// Octal-escape characters that would split an fstab field.
fn escape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        match c {
            ' ' => out.push_str("\\040"),
            '\t' => out.push_str("\\011"),
            '\n' => out.push_str("\\012"),
            '\\' => out.push_str("\\134"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut rest = field;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let code = rest.get(pos + 1..pos + 4);
        match code.and_then(|digits| u8::from_str_radix(digits, 8).ok()) {
            Some(byte) => {
                out.push(char::from(byte));
                rest = &rest[pos + 4..];
            }
            None => {
                out.push('\\');
                rest = &rest[pos + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}
