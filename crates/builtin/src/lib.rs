//! Built-in interface implementations.
//!
//! Each module provides one capability type. [`registry`] collects all of
//! them into the process-wide [`Registry`].

mod common;
mod content;
mod dbus;
mod docker;
mod docker_support;
mod network_bind;
mod physical_memory;

pub use content::Content;
pub use dbus::DBusName;
pub use docker::Docker;
pub use docker_support::DockerSupport;
pub use network_bind::NetworkBind;
pub use physical_memory::{PhysicalMemoryControl, PhysicalMemoryObserve};

use interfaces::{Interface, Registry, Result};

/// A fresh instance of every built-in interface.
pub fn interfaces() -> Vec<Box<dyn Interface>> {
    vec![
        Box::new(Content),
        Box::new(DBusName),
        Box::new(Docker),
        Box::new(DockerSupport),
        Box::new(NetworkBind),
        Box::new(PhysicalMemoryControl),
        Box::new(PhysicalMemoryObserve),
    ]
}

/// Registry holding every built-in interface.
pub fn registry() -> Result<Registry> {
    let registry = Registry::new(interfaces())?;
    tracing::debug!(interfaces = registry.len(), "built interface registry");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn every_builtin_is_registered() {
        let registry = registry().unwrap();
        assert_eq!(registry.len(), interfaces().len());
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec![
                "content",
                "dbus",
                "docker",
                "docker-support",
                "network-bind",
                "physical-memory-control",
                "physical-memory-observe",
            ]
        );
    }

    proptest! {
        #[test]
        fn lookup_returns_the_named_interface(index in 0usize..7) {
            let registry = registry().unwrap();
            let names: Vec<&str> = registry.names().collect();
            let name = names[index % names.len()];
            prop_assert_eq!(registry.lookup(name).unwrap().name(), name);
        }
    }
}
