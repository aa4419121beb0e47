//! Two unrelated snaps connected through the docker interface, compiled
//! through every backend.

use interfaces::{
    AutoConnectPolicy, Compiler, Connection, Plug, SecuritySystem, Slot, Snap, SnapInfo, SnapType,
    sanitize_snap,
};
use std::collections::BTreeSet;

fn scenario() -> (Vec<SnapInfo>, Connection) {
    let mut docker = SnapInfo::new(Snap::new("docker", SnapType::App).with_apps(["app"]));
    docker
        .plugs
        .push(Plug::new(docker.snap.clone(), "docker", "docker"));

    let mut support = SnapInfo::new(Snap::new("docker-support", SnapType::Os));
    support
        .slots
        .push(Slot::new(support.snap.clone(), "docker", "docker"));

    let registry = builtin::registry().unwrap();
    assert!(sanitize_snap(&registry, &mut docker).unwrap().is_clean());
    assert!(sanitize_snap(&registry, &mut support).unwrap().is_clean());

    let conn = Connection::new(docker.plugs[0].clone(), support.slots[0].clone()).unwrap();
    (vec![docker, support], conn)
}

#[test]
fn only_the_plug_side_is_tagged() {
    let registry = builtin::registry().unwrap();
    let (snaps, conn) = scenario();

    let compiled = Compiler::new(&registry)
        .compile_all(&snaps, &[conn])
        .unwrap();
    assert_eq!(compiled.len(), SecuritySystem::ALL.len());

    let tags: BTreeSet<String> = compiled
        .iter()
        .flat_map(|backend| backend.security_tags())
        .collect();
    assert_eq!(tags, BTreeSet::from(["snap.docker.app".to_string()]));
    assert!(compiled.iter().all(|backend| backend.failures.is_empty()));

    let by_system = |system| {
        compiled
            .iter()
            .find(|backend| backend.system == system)
            .unwrap()
    };
    assert!(
        by_system(SecuritySystem::AppArmor).profiles["snap.docker.app"].contains("run/docker.sock")
    );
    assert!(by_system(SecuritySystem::SecComp).profiles["snap.docker.app"].contains("bind\n"));
    assert!(by_system(SecuritySystem::UDev).profiles.is_empty());
    assert!(by_system(SecuritySystem::Mount).profiles.is_empty());
}

#[test]
fn slot_snap_apps_are_unaffected_by_the_connection() {
    let registry = builtin::registry().unwrap();
    let (mut snaps, _) = scenario();

    let host = Snap::new("docker-support", SnapType::Os).with_apps(["dockerd"]);
    let mut support = SnapInfo::new(host);
    support
        .slots
        .push(Slot::new(support.snap.clone(), "docker", "docker"));
    snaps[1] = support;
    let conn = Connection::new(snaps[0].plugs[0].clone(), snaps[1].slots[0].clone()).unwrap();

    let compiled = Compiler::new(&registry)
        .compile_all(&snaps, &[conn])
        .unwrap();
    let tags: BTreeSet<String> = compiled
        .iter()
        .flat_map(|backend| backend.security_tags())
        .collect();
    assert!(!tags.contains("snap.docker-support.dockerd"));
}

#[test]
fn docker_is_not_auto_connected() {
    let registry = builtin::registry().unwrap();
    let (_, conn) = scenario();

    let decision = AutoConnectPolicy::new(&registry)
        .decide(conn.plug(), conn.slot())
        .unwrap();
    assert!(!decision.is_automatic());
}
