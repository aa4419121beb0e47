//! Per-backend accumulation of policy fragments keyed by security tag.
//!
//! A [`Specification`] is built fresh for each compile cycle. Interfaces
//! never touch it directly: every producer call writes into a [`Scope`]
//! covering the tags of the plug or slot being processed, and the scope is
//! committed only when the producer succeeds. Fragments are kept in
//! insertion order and exact repeats are dropped, so feeding the same
//! contribution twice leaves the result unchanged.

use crate::interface::{ensure_plug, ensure_slot};
use crate::{Error, Interface, Plug, Result, SecuritySystem, Slot};
use indexmap::IndexSet;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;
use tracing::debug;

/// Glue between the generic [`Specification`] and one security backend.
///
/// Implementors are marker types; they pick the interface hooks to call,
/// the fragment type, and how fragments render into text.
pub trait SecurityBackend: Sized + fmt::Debug {
    const SYSTEM: SecuritySystem;

    /// One policy fragment.
    type Item: Clone + Eq + Hash + fmt::Debug;

    /// Tags that receive plug-side policy.
    fn plug_tags(plug: &Plug) -> Vec<String> {
        plug.security_tags()
    }

    /// Tags that receive slot-side policy.
    fn slot_tags(slot: &Slot) -> Vec<String> {
        slot.security_tags()
    }

    fn permanent_plug(
        iface: &dyn Interface,
        scope: &mut Scope<'_, Self>,
        plug: &Plug,
    ) -> Result<()>;

    fn permanent_slot(
        iface: &dyn Interface,
        scope: &mut Scope<'_, Self>,
        slot: &Slot,
    ) -> Result<()>;

    fn connected_plug(
        iface: &dyn Interface,
        scope: &mut Scope<'_, Self>,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<()>;

    fn connected_slot(
        iface: &dyn Interface,
        scope: &mut Scope<'_, Self>,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<()>;

    /// Reject fragments the backend compiler could not load.
    fn validate(_item: &Self::Item) -> std::result::Result<(), String> {
        Ok(())
    }

    /// Merge a tag's fragments into snippet text.
    fn snippet(items: &IndexSet<Self::Item>) -> String;

    /// Render the complete file handed to the backend compiler.
    fn profile(tag: &str, items: &IndexSet<Self::Item>) -> String;
}

/// Write buffer handed to one producer call.
#[derive(Debug)]
pub struct Scope<'a, B: SecurityBackend> {
    tags: &'a [String],
    pending: Vec<(String, B::Item)>,
}

impl<'a, B: SecurityBackend> Scope<'a, B> {
    fn new(tags: &'a [String]) -> Self {
        Self {
            tags,
            pending: Vec::new(),
        }
    }

    /// Security tags this call contributes to.
    pub fn tags(&self) -> &[String] {
        self.tags
    }

    /// Add a fragment to every tag in scope.
    pub fn add(&mut self, item: B::Item) {
        for tag in self.tags {
            self.pending.push((tag.clone(), item.clone()));
        }
    }

    /// Add a fragment to a single tag in scope.
    pub fn add_for_tag(&mut self, tag: &str, item: B::Item) -> Result<()> {
        if !self.tags.iter().any(|t| t == tag) {
            return Err(Error::Invariant(format!(
                "{} fragment targets tag {tag:?} outside of scope {:?}",
                B::SYSTEM,
                self.tags
            )));
        }
        self.pending.push((tag.to_string(), item));
        Ok(())
    }
}

impl<B: SecurityBackend<Item = String>> Scope<'_, B> {
    /// Add a text snippet to every tag in scope.
    pub fn add_snippet(&mut self, snippet: impl Into<String>) {
        self.add(snippet.into());
    }
}

/// Policy accumulated for one backend.
#[derive(Debug)]
pub struct Specification<B: SecurityBackend> {
    by_tag: BTreeMap<String, IndexSet<B::Item>>,
}

impl<B: SecurityBackend> Default for Specification<B> {
    fn default() -> Self {
        Self {
            by_tag: BTreeMap::new(),
        }
    }
}

impl<B: SecurityBackend> Specification<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn security_system(&self) -> SecuritySystem {
        B::SYSTEM
    }

    /// Record what a plug grants simply by being declared.
    pub fn add_permanent_plug(&mut self, iface: &dyn Interface, plug: &Plug) -> Result<()> {
        ensure_plug(iface.name(), plug)?;
        let tags = B::plug_tags(plug);
        self.record(iface, &tags, |scope| B::permanent_plug(iface, scope, plug))
    }

    /// Record what a slot grants its host simply by being declared.
    pub fn add_permanent_slot(&mut self, iface: &dyn Interface, slot: &Slot) -> Result<()> {
        ensure_slot(iface.name(), slot)?;
        let tags = B::slot_tags(slot);
        self.record(iface, &tags, |scope| B::permanent_slot(iface, scope, slot))
    }

    /// Record what a connection grants the plug side.
    pub fn add_connected_plug(
        &mut self,
        iface: &dyn Interface,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<()> {
        ensure_plug(iface.name(), plug)?;
        ensure_slot(iface.name(), slot)?;
        let tags = B::plug_tags(plug);
        self.record(iface, &tags, |scope| {
            B::connected_plug(iface, scope, plug, slot)
        })
    }

    /// Record what a connection grants the slot side.
    pub fn add_connected_slot(
        &mut self,
        iface: &dyn Interface,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<()> {
        ensure_plug(iface.name(), plug)?;
        ensure_slot(iface.name(), slot)?;
        let tags = B::slot_tags(slot);
        self.record(iface, &tags, |scope| {
            B::connected_slot(iface, scope, plug, slot)
        })
    }

    /// Tags that received at least one fragment, sorted.
    pub fn security_tags(&self) -> Vec<String> {
        self.by_tag.keys().cloned().collect()
    }

    /// Fragments recorded for `tag`, in insertion order.
    pub fn snippets(&self, tag: &str) -> impl Iterator<Item = &B::Item> {
        self.by_tag.get(tag).into_iter().flatten()
    }

    /// Merged snippet text for `tag`; empty when nothing was recorded.
    pub fn snippet_for_tag(&self, tag: &str) -> String {
        self.by_tag.get(tag).map(B::snippet).unwrap_or_default()
    }

    /// Complete backend file for `tag`, if the tag received anything.
    pub fn profile_for_tag(&self, tag: &str) -> Option<String> {
        self.by_tag.get(tag).map(|items| B::profile(tag, items))
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }

    fn record<F>(&mut self, iface: &dyn Interface, tags: &[String], produce: F) -> Result<()>
    where
        F: FnOnce(&mut Scope<'_, B>) -> Result<()>,
    {
        let mut scope = Scope::new(tags);
        produce(&mut scope).map_err(|err| attribute(err, B::SYSTEM, tags))?;

        for (_, item) in &scope.pending {
            B::validate(item).map_err(|reason| Error::Snippet {
                backend: B::SYSTEM,
                tags: tags.to_vec(),
                reason,
            })?;
        }

        debug!(
            backend = %B::SYSTEM,
            interface = iface.name(),
            fragments = scope.pending.len(),
            "recorded policy"
        );
        for (tag, item) in scope.pending {
            self.by_tag.entry(tag).or_default().insert(item);
        }
        Ok(())
    }
}

/// Tie a producer failure to the backend and tags it was building.
fn attribute(err: Error, backend: SecuritySystem, tags: &[String]) -> Error {
    match err {
        Error::Invariant(_) | Error::Snippet { .. } => err,
        other => Error::Snippet {
            backend,
            tags: tags.to_vec(),
            reason: other.to_string(),
        },
    }
}

/// Join text fragments, each terminated by a newline.
pub(crate) fn join_lines(items: &IndexSet<String>) -> String {
    let mut out = String::new();
    for item in items {
        out.push_str(item);
        if !item.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apparmor;
    use crate::{Snap, SnapType};
    use proptest::prelude::*;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Fixed;

    impl Interface for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn auto_connect(&self, _plug: &Plug, _slot: &Slot) -> bool {
            true
        }

        fn apparmor_connected_plug(
            &self,
            spec: &mut Scope<'_, apparmor::AppArmor>,
            _plug: &Plug,
            _slot: &Slot,
        ) -> Result<()> {
            spec.add_snippet("/dev/fixed r,");
            Ok(())
        }

        fn apparmor_permanent_slot(
            &self,
            spec: &mut Scope<'_, apparmor::AppArmor>,
            slot: &Slot,
        ) -> Result<()> {
            spec.add_snippet("/dev/fixed rw,");
            if slot.attr_str("fail").is_some() {
                return Err(Error::sanitize("fixed", "asked to fail"));
            }
            Ok(())
        }
    }

    fn pair() -> (Plug, Slot) {
        let app = Arc::new(Snap::new("consumer", SnapType::App).with_apps(["a", "b"]));
        let core = Arc::new(Snap::new("core", SnapType::Os).with_apps(["svc"]));
        (
            Plug::new(app, "fixed", "fixed"),
            Slot::new(core, "fixed", "fixed"),
        )
    }

    #[test]
    fn connected_plug_fans_out_to_every_app() {
        let (plug, slot) = pair();
        let mut spec = apparmor::Specification::new();
        spec.add_connected_plug(&Fixed, &plug, &slot).unwrap();

        assert_eq!(
            spec.security_tags(),
            vec!["snap.consumer.a", "snap.consumer.b"]
        );
        assert_eq!(spec.snippet_for_tag("snap.consumer.a"), "/dev/fixed r,\n");
    }

    #[test]
    fn untouched_tags_are_absent() {
        let (plug, slot) = pair();
        let mut spec = apparmor::Specification::new();
        spec.add_connected_slot(&Fixed, &plug, &slot).unwrap();

        assert!(spec.is_empty());
        assert_eq!(spec.snippet_for_tag("snap.core.svc"), "");
        assert!(spec.profile_for_tag("snap.core.svc").is_none());
    }

    #[test]
    fn failing_producer_commits_nothing() {
        let (_, slot) = pair();
        let slot = slot.with_attr("fail", "yes");
        let mut spec = apparmor::Specification::new();

        let err = spec.add_permanent_slot(&Fixed, &slot).unwrap_err();
        match err {
            Error::Snippet { backend, tags, .. } => {
                assert_eq!(backend, SecuritySystem::AppArmor);
                assert_eq!(tags, vec!["snap.core.svc"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(spec.security_tags().is_empty());
    }

    #[test]
    fn misrouted_plug_is_an_invariant_violation() {
        let (plug, slot) = pair();
        let mut plug = plug;
        plug.interface = "other".into();
        let mut spec = apparmor::Specification::new();

        let err = spec.add_connected_plug(&Fixed, &plug, &slot).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn add_for_tag_rejects_foreign_tags() {
        let tags = vec!["snap.a.b".to_string()];
        let mut scope: Scope<'_, apparmor::AppArmor> = Scope::new(&tags);
        assert!(scope.add_for_tag("snap.a.b", "x".into()).is_ok());
        assert!(scope
            .add_for_tag("snap.c.d", "x".into())
            .unwrap_err()
            .is_invariant_violation());
    }

    proptest! {
        #[test]
        fn repeated_contributions_are_idempotent(times in 1usize..6) {
            let (plug, slot) = pair();
            let mut once = apparmor::Specification::new();
            once.add_connected_plug(&Fixed, &plug, &slot).unwrap();

            let mut many = apparmor::Specification::new();
            for _ in 0..times {
                many.add_connected_plug(&Fixed, &plug, &slot).unwrap();
            }

            prop_assert_eq!(once.security_tags(), many.security_tags());
            for tag in once.security_tags() {
                prop_assert_eq!(once.snippet_for_tag(&tag), many.snippet_for_tag(&tag));
            }
        }
    }
}
