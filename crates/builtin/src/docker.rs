//! Access to the docker daemon socket.

use interfaces::{Interface, Plug, Result, Slot, apparmor, seccomp};

const DOCKER_CONNECTED_PLUG_APPARMOR: &str = r#"
# Description: allow access to the Docker daemon socket. This gives privileged
# access to the system via Docker's socket API.

# Allow talking to the docker daemon
/{,var/}run/docker.sock rw,
"#;

const DOCKER_CONNECTED_PLUG_SECCOMP: &str = r#"
# Description: allow access to the Docker daemon socket. This gives privileged
# access to the system via Docker's socket API.

bind
socket
setsockopt
"#;

/// Client access to a docker daemon's socket.
#[derive(Debug, Default)]
pub struct Docker;

impl Interface for Docker {
    fn name(&self) -> &'static str {
        "docker"
    }

    fn auto_connect(&self, _plug: &Plug, _slot: &Slot) -> bool {
        false
    }

    fn apparmor_connected_plug(
        &self,
        spec: &mut apparmor::Scope<'_>,
        _plug: &Plug,
        _slot: &Slot,
    ) -> Result<()> {
        spec.add_snippet(DOCKER_CONNECTED_PLUG_APPARMOR);
        Ok(())
    }

    fn seccomp_connected_plug(
        &self,
        spec: &mut seccomp::Scope<'_>,
        _plug: &Plug,
        _slot: &Slot,
    ) -> Result<()> {
        spec.add_snippet(DOCKER_CONNECTED_PLUG_SECCOMP);
        Ok(())
    }
}
