//! Name-indexed table of interface implementations.

use crate::{Error, Interface, Result};
use std::collections::BTreeMap;

/// Immutable mapping from interface name to implementation.
///
/// Built once at process start and passed by reference to the sanitizer,
/// the auto-connect policy and the compiler.
#[derive(Debug, Default)]
pub struct Registry {
    interfaces: BTreeMap<&'static str, Box<dyn Interface>>,
}

impl Registry {
    /// Build a registry, rejecting two implementations with the same name.
    pub fn new(interfaces: impl IntoIterator<Item = Box<dyn Interface>>) -> Result<Self> {
        let mut table = BTreeMap::new();
        for iface in interfaces {
            let name = iface.name();
            if table.insert(name, iface).is_some() {
                return Err(Error::DuplicateInterface(name.to_string()));
            }
        }
        Ok(Self { interfaces: table })
    }

    pub fn get(&self, name: &str) -> Option<&dyn Interface> {
        self.interfaces.get(name).map(|iface| iface.as_ref())
    }

    /// Like [`Registry::get`], but an unknown name is an error.
    pub fn lookup(&self, name: &str) -> Result<&dyn Interface> {
        self.get(name)
            .ok_or_else(|| Error::UnknownInterface(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.interfaces.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Interface> {
        self.interfaces.values().map(|iface| iface.as_ref())
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}
