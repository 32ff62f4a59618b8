// sal-core/tests/inventory.rs
mod common;

use common::{remote, Rig};
use sal_common::model::{Classification, ConnectionStatus, OperationKind};

#[test]
fn unreachable_device_leaves_local_only() {
    let rig = Rig::new();
    rig.add_local("foo.so", 100);
    rig.device.put(&remote("foo"), 100);
    rig.device.set_reachable(false);
    assert_eq!(rig.connect(), ConnectionStatus::Disconnected);

    rig.scan();
    let inv = rig.scanner.inventory();
    assert_eq!(inv.len(), 1);
    let foo = inv.find("foo").unwrap();
    assert_eq!(foo.classification(), Classification::LocalOnly);
    assert_eq!(foo.local_size(), Some(100));
    assert_eq!(foo.remote_size(), None);
    assert_eq!(foo.remote_path(), None);
}

#[test]
fn scan_without_probe_skips_device() {
    let rig = Rig::new();
    rig.device.put(&remote("foo"), 10);
    // Status is still Unknown; the scan must neither probe nor list.
    rig.scan();
    assert!(rig.scanner.inventory().is_empty());
    assert!(rig.device.commands().is_empty());
}

#[test]
fn connected_device_merges_into_synced() {
    let rig = Rig::new();
    rig.add_local("foo.so", 100);
    rig.device.put(&remote("foo"), 120);
    assert_eq!(rig.connect(), ConnectionStatus::Connected);

    rig.scan();
    let inv = rig.scanner.inventory();
    assert_eq!(inv.len(), 1);
    let foo = inv.find("foo").unwrap();
    assert_eq!(foo.classification(), Classification::Synced);
    assert_eq!(foo.local_size(), Some(100));
    assert_eq!(foo.remote_size(), Some(120));
    assert_eq!(foo.remote_path(), Some("/tmp/plugins/foo.so"));
}

#[test]
fn every_record_matches_its_paths() {
    let rig = Rig::new();
    rig.add_local("now_playing.so", 1);
    rig.add_local("wifi.so", 2);
    rig.device.put(&remote("wifi"), 2);
    rig.device.put(&remote("clock"), 3);
    rig.device.put("/tmp/plugins/readme.txt", 1);
    rig.connect();

    rig.scan();
    let inv = rig.scanner.inventory();
    assert_eq!(inv.len(), 3);
    for record in inv.iter() {
        assert!(record.is_local() || record.is_on_device());
        assert_eq!(
            Some(record.classification()),
            Classification::from_presence(record.is_local(), record.is_on_device())
        );
    }
    let counts = inv.counts();
    assert_eq!(counts.synced, 1);
    assert_eq!(counts.device_only, 1);
    assert_eq!(counts.local_only, 1);
    assert_eq!(inv.find("now_playing").unwrap().display_name(), "Now Playing");
}

#[test]
fn refresh_is_idempotent() {
    let rig = Rig::new();
    rig.add_local("a.so", 1);
    rig.add_local("b.so", 2);
    rig.device.put(&remote("b"), 2);
    rig.device.put(&remote("c"), 3);
    rig.connect();

    rig.scan();
    let first = rig.scanner.inventory();
    rig.scan();
    assert_eq!(rig.scanner.inventory(), first);
}

#[test]
fn refresh_replaces_previous_inventory() {
    let rig = Rig::new();
    rig.add_local("a.so", 1);
    rig.add_local("b.so", 1);
    rig.scan();
    assert_eq!(rig.scanner.inventory().len(), 2);

    rig.remove_local("a.so");
    rig.scan();
    let inv = rig.scanner.inventory();
    assert_eq!(inv.len(), 1);
    assert!(inv.find("a").is_none());
}

#[test]
fn refresh_reports_count_and_releases_slot() {
    let rig = Rig::new();
    rig.add_local("a.so", 1);
    rig.add_local("b.so", 1);

    assert!(rig.deployer.refresh());
    let state = rig.deployer.operation_state();
    assert_eq!(state.kind, OperationKind::None);
    assert!(state.complete);
    assert!(state.success);
    assert_eq!(state.progress, 1.0);
    assert_eq!(state.status_message, "Found 2 plugins");
}

#[test]
fn local_dir_can_be_switched() {
    let rig = Rig::new();
    rig.add_local("a.so", 1);
    let other = tempfile::tempdir().unwrap();
    std::fs::write(other.path().join("z.so"), b"zz").unwrap();

    rig.scanner.set_local_dir(other.path());
    assert_eq!(rig.scanner.local_dir(), other.path());
    rig.scan();
    let inv = rig.scanner.inventory();
    assert!(inv.find("a").is_none());
    assert_eq!(inv.find("z").unwrap().local_size(), Some(2));
}

#[test]
fn missing_local_dir_still_scans_device() {
    let rig = Rig::new();
    rig.scanner.set_local_dir("/no/such/plugin/dir");
    rig.device.put(&remote("clock"), 3);
    rig.connect();

    rig.scan();
    let inv = rig.scanner.inventory();
    assert_eq!(inv.len(), 1);
    assert_eq!(
        inv.find("clock").unwrap().classification(),
        Classification::DeviceOnly
    );
}
