//! Listening on network sockets.

use crate::common::sanitize_os_slot;
use interfaces::{Interface, Plug, Result, Slot, apparmor, seccomp};

const NETWORK_BIND_CONNECTED_PLUG_APPARMOR: &str = r#"
# Description: Can access the network as a server.
#include <abstractions/nameservice>
@{PROC}/sys/net/core/somaxconn r,
@{PROC}/sys/net/ipv4/tcp_fastopen r,

network inet,
network inet6,
"#;

const NETWORK_BIND_CONNECTED_PLUG_SECCOMP: &str = r#"
# Description: Can access the network as a server.
accept
accept4
bind
listen
shutdown
socket
setsockopt
getsockname
"#;

/// Server-side network access. Slots live on the core snap only.
#[derive(Debug, Default)]
pub struct NetworkBind;

impl Interface for NetworkBind {
    fn name(&self) -> &'static str {
        "network-bind"
    }

    fn sanitize_slot(&self, slot: &mut Slot) -> Result<()> {
        sanitize_os_slot(self.name(), slot)
    }

    fn auto_connect(&self, _plug: &Plug, _slot: &Slot) -> bool {
        true
    }

    fn apparmor_connected_plug(
        &self,
        spec: &mut apparmor::Scope<'_>,
        _plug: &Plug,
        _slot: &Slot,
    ) -> Result<()> {
        spec.add_snippet(NETWORK_BIND_CONNECTED_PLUG_APPARMOR);
        Ok(())
    }

    fn seccomp_connected_plug(
        &self,
        spec: &mut seccomp::Scope<'_>,
        _plug: &Plug,
        _slot: &Slot,
    ) -> Result<()> {
        spec.add_snippet(NETWORK_BIND_CONNECTED_PLUG_SECCOMP);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::testing::{os_slot, plug};

    #[test]
    fn seccomp_allows_listening() {
        let p = plug("web", &["server"], "network-bind");
        let s = os_slot("network-bind");
        let mut spec = seccomp::Specification::new();
        spec.add_connected_plug(&NetworkBind, &p, &s).unwrap();

        let profile = seccomp::Profile::parse(&spec.snippet_for_tag("snap.web.server")).unwrap();
        assert!(profile.allows("listen"));
        assert!(profile.allows("accept4"));
    }

    #[test]
    fn auto_connects() {
        assert!(NetworkBind.auto_connect(
            &plug("web", &["server"], "network-bind"),
            &os_slot("network-bind")
        ));
    }
}
