use interfaces::{Plug, Slot};
use serde::{Deserialize, Serialize};

/// A single allow or deny rule.
///
/// Empty lists match anything. Entries are exact names, `*`, or a prefix
/// ending in `*`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Interface the rule applies to.
    pub interface: String,

    /// Snaps whose plugs are covered.
    #[serde(default)]
    pub plug_snaps: Vec<String>,

    /// Snaps whose slots are covered.
    #[serde(default)]
    pub slot_snaps: Vec<String>,

    /// Publishers whose plugs are covered.
    #[serde(default)]
    pub plug_publishers: Vec<String>,
}

impl Rule {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            ..Default::default()
        }
    }

    pub fn with_plug_snaps(mut self, snaps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.plug_snaps = snaps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_slot_snaps(mut self, snaps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.slot_snaps = snaps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_plug_publishers(
        mut self,
        publishers: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.plug_publishers = publishers.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the rule covers this plug/slot pairing.
    pub fn matches(&self, plug: &Plug, slot: &Slot) -> bool {
        self.interface == plug.interface
            && matches_any(&self.plug_snaps, Some(&plug.snap.name))
            && matches_any(&self.slot_snaps, Some(&slot.snap.name))
            && matches_any(&self.plug_publishers, plug.snap.publisher.as_deref())
    }
}

fn matches_any(patterns: &[String], value: Option<&str>) -> bool {
    if patterns.is_empty() {
        return true;
    }
    let Some(value) = value else {
        return false;
    };
    patterns.iter().any(|pattern| {
        if pattern == "*" {
            return true;
        }
        match pattern.strip_suffix('*') {
            Some(prefix) => value.starts_with(prefix),
            None => pattern == value,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use interfaces::{Snap, SnapType};
    use std::sync::Arc;

    fn pair(publisher: Option<&str>) -> (Plug, Slot) {
        let mut snap = Snap::new("docker", SnapType::App).with_apps(["app"]);
        if let Some(publisher) = publisher {
            snap = snap.with_publisher(publisher);
        }
        let core = Arc::new(Snap::new("core", SnapType::Os));
        (
            Plug::new(Arc::new(snap), "docker", "docker"),
            Slot::new(core, "docker", "docker"),
        )
    }

    #[test]
    fn bare_rule_matches_interface() {
        let (plug, slot) = pair(None);
        assert!(Rule::new("docker").matches(&plug, &slot));
        assert!(!Rule::new("content").matches(&plug, &slot));
    }

    #[test]
    fn snap_patterns() {
        let (plug, slot) = pair(None);
        assert!(Rule::new("docker").with_plug_snaps(["docker"]).matches(&plug, &slot));
        assert!(Rule::new("docker").with_plug_snaps(["dock*"]).matches(&plug, &slot));
        assert!(Rule::new("docker").with_slot_snaps(["*"]).matches(&plug, &slot));
        assert!(!Rule::new("docker").with_plug_snaps(["podman"]).matches(&plug, &slot));
        assert!(!Rule::new("docker").with_slot_snaps(["gadget"]).matches(&plug, &slot));
    }

    #[test]
    fn publisher_patterns_need_a_publisher() {
        let rule = Rule::new("docker").with_plug_publishers(["canonical"]);

        let (plug, slot) = pair(Some("canonical"));
        assert!(rule.matches(&plug, &slot));

        let (plug, slot) = pair(None);
        assert!(!rule.matches(&plug, &slot));
    }
}
