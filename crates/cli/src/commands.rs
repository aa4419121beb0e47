//! Subcommand implementations.
//!
//! Each command writes its report to `out`; `main` passes stdout.

use crate::error::{Error, Result};
use crate::system::System;
use interfaces::{
    AutoConnectPolicy, CompiledBackend, Compiler, ConnectionDeclarations, Decision, Registry,
    SecuritySystem, candidates,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// List registered interface names.
pub fn list_interfaces(registry: &Registry, out: &mut impl Write) -> Result<()> {
    for name in registry.names() {
        writeln!(out, "{name}")?;
    }
    Ok(())
}

/// Report declarations that failed sanitization.
pub fn check(system: &System, out: &mut impl Write) -> Result<()> {
    for rejected in &system.rejected {
        writeln!(
            out,
            "rejected {} ({}): {}",
            rejected.declaration, rejected.interface, rejected.error
        )?;
    }
    let plugs: usize = system.snaps.iter().map(|info| info.plugs.len()).sum();
    let slots: usize = system.snaps.iter().map(|info| info.slots.len()).sum();
    writeln!(
        out,
        "{} snaps, {plugs} plugs, {slots} slots, {} connections, {} rejected",
        system.snaps.len(),
        system.connections.len(),
        system.rejected.len()
    )?;
    Ok(())
}

/// Print the auto-connect decision for every plug/slot pairing.
pub fn candidates_report(
    registry: &Registry,
    declarations: &dyn ConnectionDeclarations,
    system: &System,
    out: &mut impl Write,
) -> Result<()> {
    let policy = AutoConnectPolicy::new(registry).with_declarations(declarations);
    let pairs = candidates(&system.snaps);
    if pairs.is_empty() {
        writeln!(out, "No candidate connections.")?;
        return Ok(());
    }
    for (plug, slot) in pairs {
        match policy.decide(plug, slot)? {
            Decision::Connect => writeln!(out, "{plug} -> {slot}: connect")?,
            Decision::Ask { reason } => writeln!(out, "{plug} -> {slot}: ask ({reason})")?,
        }
    }
    Ok(())
}

/// Which profiles `compile` emits.
#[derive(Debug, Default, Clone)]
pub struct CompileOptions {
    pub backend: Option<SecuritySystem>,
    pub tag: Option<String>,
    /// Write files here instead of printing.
    pub output_dir: Option<PathBuf>,
}

/// Compile the declared connections and print or write per-tag profiles.
///
/// Tags whose policy could not be built are reported to `out` and skipped.
pub fn compile(
    registry: &Registry,
    system: &System,
    options: &CompileOptions,
    out: &mut impl Write,
) -> Result<()> {
    let compiler = Compiler::new(registry);
    let compiled = match options.backend {
        Some(backend) => {
            vec![compiler.compile_system(backend, &system.snaps, &system.connections)?]
        }
        None => compiler.compile_all(&system.snaps, &system.connections)?,
    };

    for backend in &compiled {
        for (tag, reason) in &backend.failures {
            if options.tag.as_deref().is_none_or(|wanted| wanted == tag.as_str()) {
                writeln!(out, "# {} {tag}: failed: {reason}", backend.system)?;
            }
        }
        for (tag, profile) in selected(backend, options.tag.as_deref()) {
            match &options.output_dir {
                Some(dir) => {
                    let path = write_profile(dir, backend.system, tag, profile)?;
                    writeln!(out, "{}", path.display())?;
                }
                None => {
                    writeln!(out, "# {} {tag}", backend.system)?;
                    write!(out, "{profile}")?;
                    if !profile.ends_with('\n') {
                        writeln!(out)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn selected<'a>(
    backend: &'a CompiledBackend,
    tag: Option<&'a str>,
) -> impl Iterator<Item = (&'a String, &'a String)> {
    backend
        .profiles
        .iter()
        .filter(move |(name, _)| tag.is_none_or(|wanted| wanted == name.as_str()))
}

/// File name a backend's profile for `tag` is installed under.
pub fn profile_file_name(system: SecuritySystem, tag: &str) -> String {
    match system {
        SecuritySystem::AppArmor => tag.to_string(),
        SecuritySystem::SecComp => format!("{tag}.src"),
        SecuritySystem::UDev => format!("70-{tag}.rules"),
        SecuritySystem::DBus => format!("{tag}.conf"),
        SecuritySystem::Mount => format!("{tag}.fstab"),
    }
}

fn write_profile(dir: &Path, system: SecuritySystem, tag: &str, profile: &str) -> Result<PathBuf> {
    let backend_dir = dir.join(system.as_str());
    std::fs::create_dir_all(&backend_dir)?;
    let path = backend_dir.join(profile_file_name(system, tag));
    std::fs::write(&path, profile)?;
    info!(path = %path.display(), "wrote profile");
    Ok(path)
}

/// Parse a `--backend` value.
pub fn parse_backend(name: &str) -> Result<SecuritySystem> {
    name.parse().map_err(Error::UnknownBackend)
}
