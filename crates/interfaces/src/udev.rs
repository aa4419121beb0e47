//! Device-tagging (udev) backend.

use crate::specification::{self, SecurityBackend};
use crate::{Interface, Plug, Result, SecuritySystem, Slot};
use indexmap::IndexSet;

/// Marker for the udev backend.
#[derive(Debug)]
pub struct UDev;

pub type Specification = specification::Specification<UDev>;
pub type Scope<'a> = specification::Scope<'a, UDev>;

/// Split one rule into its `(key, operator, value)` assignments.
fn assignments(rule: &str) -> std::result::Result<Vec<(&str, &str, &str)>, String> {
    let mut out = Vec::new();
    let mut rest = rule.trim();
    while !rest.is_empty() {
        let key_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '{' | '}')))
            .unwrap_or(rest.len());
        let (key, after) = rest.split_at(key_len);
        let open = after
            .find('"')
            .ok_or_else(|| format!("missing value in rule {rule:?}"))?;
        let op = after[..open].trim();
        let after = &after[open + 1..];
        let close = after
            .find('"')
            .ok_or_else(|| format!("unterminated value in rule {rule:?}"))?;
        if key.is_empty() || op.is_empty() {
            return Err(format!("malformed assignment in rule {rule:?}"));
        }
        out.push((key, op, &after[..close]));

        rest = after[close + 1..].trim_start();
        if let Some(next) = rest.strip_prefix(',') {
            rest = next.trim_start();
        } else if !rest.is_empty() {
            return Err(format!("expected ',' in rule {rule:?}"));
        }
    }
    Ok(out)
}

/// Build the rule tagging devices matching `kernel` for `tag`.
pub fn tag_rule(kernel: &str, tag: &str) -> String {
    format!(r#"KERNEL=="{kernel}", TAG+="{tag}""#)
}

impl Scope<'_> {
    /// Tag devices whose kernel name matches `kernel`, one rule per tag in scope.
    pub fn tag_device(&mut self, kernel: &str) -> Result<()> {
        let tags = self.tags().to_vec();
        for tag in &tags {
            self.add_for_tag(tag, tag_rule(kernel, tag))?;
        }
        Ok(())
    }
}

impl SecurityBackend for UDev {
    const SYSTEM: SecuritySystem = SecuritySystem::UDev;
    type Item = String;

    fn permanent_plug(iface: &dyn Interface, scope: &mut Scope<'_>, plug: &Plug) -> Result<()> {
        iface.udev_permanent_plug(scope, plug)
    }

    fn permanent_slot(iface: &dyn Interface, scope: &mut Scope<'_>, slot: &Slot) -> Result<()> {
        iface.udev_permanent_slot(scope, slot)
    }

    fn connected_plug(
        iface: &dyn Interface,
        scope: &mut Scope<'_>,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<()> {
        iface.udev_connected_plug(scope, plug, slot)
    }

    fn connected_slot(
        iface: &dyn Interface,
        scope: &mut Scope<'_>,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<()> {
        iface.udev_connected_slot(scope, plug, slot)
    }

    /// Rules may only match devices and add tags.
    fn validate(item: &String) -> std::result::Result<(), String> {
        for line in item.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            for (key, op, _) in assignments(line)? {
                match (key, op) {
                    (_, "==" | "!=") | ("TAG", "+=") => {}
                    _ => return Err(format!("device rules may only tag devices, found {key}{op}")),
                }
            }
        }
        Ok(())
    }

    fn snippet(items: &IndexSet<String>) -> String {
        specification::join_lines(items)
    }

    fn profile(tag: &str, items: &IndexSet<String>) -> String {
        format!("# udev tagging rules for {tag}\n{}", Self::snippet(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, Snap, SnapType};
    use std::sync::Arc;

    #[test]
    fn tag_rule_format() {
        assert_eq!(
            tag_rule("mem", "snap.foo.app"),
            r#"KERNEL=="mem", TAG+="snap.foo.app""#
        );
    }

    #[test]
    fn program_execution_is_rejected() {
        assert!(UDev::validate(&r#"KERNEL=="mem", RUN+="/bin/sh""#.to_string()).is_err());
        assert!(UDev::validate(&r#"PROGRAM="/bin/true""#.to_string()).is_err());
        assert!(UDev::validate(&tag_rule("mem", "snap.foo.app")).is_ok());
    }

    #[test]
    fn only_matches_and_tags_are_accepted() {
        let matches = r#"SUBSYSTEM=="usb", ATTR{idVendor}!="0001", TAG+="snap.foo.app""#;
        assert!(UDev::validate(&matches.to_string()).is_ok());

        let tag = r#"x", MODE="0666"#;
        let err = UDev::validate(&tag_rule("mem", &format!("snap.foo.{tag}"))).unwrap_err();
        assert!(err.contains("MODE="));

        assert!(UDev::validate(&r#"KERNEL=="mem", OWNER="nobody""#.to_string()).is_err());
        assert!(UDev::validate(&r#"KERNEL=="mem", TAG+="unterminated"#.to_string()).is_err());
        assert!(UDev::validate(&r#"KERNEL=="mem" TAG+="a""#.to_string()).is_err());
    }

    #[derive(Debug)]
    struct Memory;

    impl Interface for Memory {
        fn name(&self) -> &'static str {
            "memory"
        }

        fn auto_connect(&self, _plug: &Plug, _slot: &Slot) -> bool {
            false
        }

        fn udev_connected_plug(
            &self,
            spec: &mut Scope<'_>,
            _plug: &Plug,
            _slot: &Slot,
        ) -> Result<()> {
            spec.tag_device("mem")
        }
    }

    #[test]
    fn injected_tag_fails_the_connection() {
        let app = Arc::new(Snap::new("foo", SnapType::App));
        let core = Arc::new(Snap::new("core", SnapType::Os));
        let plug = Plug::new(app, "memory", "memory").with_apps([r#"x", MODE="0666"#]);
        let slot = Slot::new(core, "memory", "memory");

        let mut spec = Specification::new();
        let err = spec.add_connected_plug(&Memory, &plug, &slot).unwrap_err();
        assert!(matches!(err, Error::Snippet { .. }));
        assert!(spec.is_empty());
    }
}
