//! Declarations configuration and evaluation.

use crate::{Error, Result, Rule};
use interfaces::{ConnectionDeclarations, Plug, Registry, Slot};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Connection declarations loaded from TOML.
///
/// ```toml
/// [[allow]]
/// interface = "docker"
/// plug_snaps = ["docker"]
///
/// [[deny]]
/// interface = "physical-memory-observe"
/// plug_publishers = ["untrusted"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declarations {
    /// Connections made without asking.
    #[serde(default)]
    pub allow: Vec<Rule>,

    /// Connections never made automatically (overrides allow).
    #[serde(default)]
    pub deny: Vec<Rule>,
}

impl Declarations {
    /// Load declarations from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse declarations from a TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        let declarations: Self = toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))?;
        declarations.check_rules()?;
        Ok(declarations)
    }

    pub fn allow(mut self, rule: Rule) -> Self {
        self.allow.push(rule);
        self
    }

    pub fn deny(mut self, rule: Rule) -> Self {
        self.deny.push(rule);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty()
    }

    /// Check that every rule names an interface known to `registry`.
    pub fn validate(&self, registry: &Registry) -> Result<()> {
        self.check_rules()?;
        for rule in self.rules() {
            if registry.get(&rule.interface).is_none() {
                return Err(Error::Invalid(format!(
                    "rule refers to unknown interface {:?}",
                    rule.interface
                )));
            }
        }
        Ok(())
    }

    /// `Some(false)` if a deny rule matches, `Some(true)` if an allow rule
    /// matches, otherwise `None`.
    pub fn check(&self, plug: &Plug, slot: &Slot) -> Option<bool> {
        if let Some(rule) = self.deny.iter().find(|rule| rule.matches(plug, slot)) {
            debug!(
                plug = %plug,
                slot = %slot,
                interface = %rule.interface,
                "denied by declaration"
            );
            return Some(false);
        }
        if let Some(rule) = self.allow.iter().find(|rule| rule.matches(plug, slot)) {
            debug!(
                plug = %plug,
                slot = %slot,
                interface = %rule.interface,
                "allowed by declaration"
            );
            return Some(true);
        }
        None
    }

    fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.allow.iter().chain(&self.deny)
    }

    /// Check rule syntax: a non-empty interface and well-formed patterns.
    pub fn check_rules(&self) -> Result<()> {
        for rule in self.rules() {
            if rule.interface.trim().is_empty() {
                return Err(Error::Invalid("rule must name an interface".to_string()));
            }
            let patterns = rule
                .plug_snaps
                .iter()
                .chain(&rule.slot_snaps)
                .chain(&rule.plug_publishers);
            for pattern in patterns {
                let literal = pattern.strip_suffix('*').unwrap_or(pattern);
                if pattern.is_empty() || literal.contains('*') {
                    return Err(Error::Invalid(format!(
                        "invalid pattern {pattern:?} in rule for {:?}",
                        rule.interface
                    )));
                }
            }
        }
        Ok(())
    }
}

impl ConnectionDeclarations for Declarations {
    fn auto_connect(&self, plug: &Plug, slot: &Slot) -> Option<bool> {
        self.check(plug, slot)
    }
}
