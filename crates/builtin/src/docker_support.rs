//! Privileges a docker daemon needs to manage containers.

use crate::common::sanitize_os_slot;
use interfaces::{Error, Interface, Plug, Result, Slot, apparmor, ensure_plug, seccomp};
use serde_json::Value;

const PRIVILEGED_CONTAINERS: &str = "privileged-containers";

const DOCKER_SUPPORT_CONNECTED_PLUG_APPARMOR: &str = r#"
# Description: allow operating as the Docker daemon. This policy is
# intentionally not restrictive and is here to help guard against programming
# errors and not for security confinement.

# Allow sockets
/{,var/}run/docker.sock rw,
/{,var/}run/docker/ rw,
/{,var/}run/docker/** mrwklix,
/{,var/}run/runc/ rw,
/{,var/}run/runc/** mrwklix,

# Wide read access to /proc, but somewhat limited writes for now
@{PROC}/ r,
@{PROC}/** r,
@{PROC}/[0-9]*/attr/exec w,
@{PROC}/sys/net/** w,

# Wide read access to /sys
/sys/** r,
/sys/fs/cgroup/** rw,

# Container filesystems
mount,
umount,
pivot_root,

capability sys_admin,
capability net_admin,
capability setuid,
capability setgid,
capability dac_override,
capability kill,

# Manage container profiles
/sbin/apparmor_parser ixr,
/sys/kernel/security/apparmor/{,**} r,
/sys/kernel/security/apparmor/.replace rw,
"#;

const DOCKER_SUPPORT_PRIVILEGED_APPARMOR: &str = r#"
# Description: allow docker daemon to run privileged containers. This gives
# full access to all resources on the system and thus gives device ownership
# to connected snaps.

# These rules are here to allow Docker to launch unconfined containers but
# allow the docker daemon itself to go unconfined.
change_profile -> *,
signal (send) peer=unconfined,
ptrace (read, trace) peer=unconfined,
"#;

const DOCKER_SUPPORT_CONNECTED_PLUG_SECCOMP: &str = r#"
# Description: allow operating as the Docker daemon.
pivot_root
mount
umount
umount2
unshare
setns
sethostname
chroot
keyctl
add_key
setgroups
setgroups32
"#;

const DOCKER_SUPPORT_PRIVILEGED_SECCOMP: &str = r#"
# Description: allow docker daemon to run privileged containers.
@unrestricted
"#;

/// Operating as the docker daemon. Slots live on the core snap only.
#[derive(Debug, Default)]
pub struct DockerSupport;

impl DockerSupport {
    fn privileged(plug: &Plug) -> bool {
        matches!(plug.attr(PRIVILEGED_CONTAINERS), Some(Value::Bool(true)))
    }
}

impl Interface for DockerSupport {
    fn name(&self) -> &'static str {
        "docker-support"
    }

    fn sanitize_plug(&self, plug: &mut Plug) -> Result<()> {
        ensure_plug(self.name(), plug)?;
        match plug.attr(PRIVILEGED_CONTAINERS) {
            None | Some(Value::Bool(_)) => Ok(()),
            Some(other) => Err(Error::sanitize(
                self.name(),
                format!("{PRIVILEGED_CONTAINERS} attribute must be a boolean, got {other}"),
            )),
        }
    }

    fn sanitize_slot(&self, slot: &mut Slot) -> Result<()> {
        sanitize_os_slot(self.name(), slot)
    }

    fn auto_connect(&self, _plug: &Plug, _slot: &Slot) -> bool {
        false
    }

    fn apparmor_connected_plug(
        &self,
        spec: &mut apparmor::Scope<'_>,
        plug: &Plug,
        _slot: &Slot,
    ) -> Result<()> {
        spec.add_snippet(DOCKER_SUPPORT_CONNECTED_PLUG_APPARMOR);
        if Self::privileged(plug) {
            spec.add_snippet(DOCKER_SUPPORT_PRIVILEGED_APPARMOR);
        }
        Ok(())
    }

    fn seccomp_connected_plug(
        &self,
        spec: &mut seccomp::Scope<'_>,
        plug: &Plug,
        _slot: &Slot,
    ) -> Result<()> {
        spec.add_snippet(DOCKER_SUPPORT_CONNECTED_PLUG_SECCOMP);
        if Self::privileged(plug) {
            spec.add_snippet(DOCKER_SUPPORT_PRIVILEGED_SECCOMP);
        }
        Ok(())
    }
}
