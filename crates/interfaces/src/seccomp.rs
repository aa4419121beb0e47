//! Syscall-filter (seccomp) backend and its filter source format.
//!
//! The filter loader reads one syscall name per line. Lines starting with
//! `#` are comments, blank lines are skipped, `@unrestricted` disables
//! filtering altogether, and no line may exceed [`MAX_LINE_LEN`] characters.

use crate::specification::{self, SecurityBackend};
use crate::{Error, Interface, Plug, Result, SecuritySystem, Slot};
use indexmap::IndexSet;

/// Longest line the filter loader accepts, excluding the newline.
pub const MAX_LINE_LEN: usize = 80;

/// Special line that turns the filter off.
pub const UNRESTRICTED: &str = "@unrestricted";

/// Syscalls every confined app may use.
const DEFAULT_TEMPLATE: &str = "\
# Description: base syscalls allowed for every confined app
access
arch_prctl
brk
clock_gettime
clone
close
dup
dup2
execve
exit
exit_group
fcntl
fstat
futex
getcwd
getdents64
getpid
getrandom
gettid
ioctl
lseek
mmap
mprotect
munmap
nanosleep
newfstatat
openat
pipe2
poll
read
readlink
rt_sigaction
rt_sigprocmask
rt_sigreturn
set_robust_list
set_tid_address
stat
uname
wait4
write
";

/// Marker for the seccomp backend.
#[derive(Debug)]
pub struct SecComp;

pub type Specification = specification::Specification<SecComp>;
pub type Scope<'a> = specification::Scope<'a, SecComp>;

impl SecurityBackend for SecComp {
    const SYSTEM: SecuritySystem = SecuritySystem::SecComp;
    type Item = String;

    fn permanent_plug(iface: &dyn Interface, scope: &mut Scope<'_>, plug: &Plug) -> Result<()> {
        iface.seccomp_permanent_plug(scope, plug)
    }

    fn permanent_slot(iface: &dyn Interface, scope: &mut Scope<'_>, slot: &Slot) -> Result<()> {
        iface.seccomp_permanent_slot(scope, slot)
    }

    fn connected_plug(
        iface: &dyn Interface,
        scope: &mut Scope<'_>,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<()> {
        iface.seccomp_connected_plug(scope, plug, slot)
    }

    fn connected_slot(
        iface: &dyn Interface,
        scope: &mut Scope<'_>,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<()> {
        iface.seccomp_connected_slot(scope, plug, slot)
    }

    fn validate(item: &String) -> std::result::Result<(), String> {
        Profile::parse(item).map(|_| ()).map_err(|e| e.to_string())
    }

    fn snippet(items: &IndexSet<String>) -> String {
        specification::join_lines(items)
    }

    fn profile(_tag: &str, items: &IndexSet<String>) -> String {
        let mut out = String::from(DEFAULT_TEMPLATE);
        out.push_str(&Self::snippet(items));
        out
    }
}

/// A parsed filter source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    /// Filtering is disabled; any syscalls listed after the marker are ignored.
    pub unrestricted: bool,
    /// Allowed syscalls in source order, without duplicates.
    pub syscalls: Vec<String>,
}

impl Profile {
    /// Parse filter source text.
    pub fn parse(source: &str) -> Result<Self> {
        let mut profile = Profile::default();

        for (index, raw) in source.lines().enumerate() {
            let line = index + 1;
            if raw.starts_with('#') {
                continue;
            }
            if raw.chars().count() > MAX_LINE_LEN {
                return Err(Error::SeccompProfile {
                    line,
                    reason: format!("line too long ({MAX_LINE_LEN} characters max)"),
                });
            }

            let entry = raw.trim_end();
            if entry.is_empty() {
                continue;
            }
            if entry == UNRESTRICTED {
                profile.unrestricted = true;
                break;
            }
            if entry.contains(char::is_whitespace) {
                return Err(Error::SeccompProfile {
                    line,
                    reason: format!("expected a single syscall name, got {entry:?}"),
                });
            }
            if !profile.syscalls.iter().any(|s| s == entry) {
                profile.syscalls.push(entry.to_string());
            }
        }

        Ok(profile)
    }

    /// Whether `syscall` is permitted by this filter.
    pub fn allows(&self, syscall: &str) -> bool {
        self.unrestricted || self.syscalls.iter().any(|s| s == syscall)
    }
}
