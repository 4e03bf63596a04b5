mod support;

use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use modploy_core::host::{HostEvent, ModuleHandle};
use support::*;

#[test]
fn first_sighting_installs() {
    let temp = TempDir::new().unwrap();
    let path = write_file(temp.path(), "foo-1.0.jar", &module_jar("foo", "1.0"));
    let (host, installer) = host_and_installer();

    let module = installer.install_or_update(&path, false).expect("installed");

    assert_eq!(module.location(), &loc("foo:1.0"));
    assert_eq!(host.events(), vec![HostEvent::Installed(loc("foo:1.0"))]);
}

#[test]
fn bulk_scan_leaves_present_module_alone() {
    let temp = TempDir::new().unwrap();
    let path = write_file(temp.path(), "foo-1.0.jar", &module_jar("foo", "1.0"));
    let (host, installer) = host_and_installer();
    installer.install_or_update(&path, false).unwrap();
    host.clear_events();

    write_file(
        temp.path(),
        "foo-1.0.jar",
        &module_jar_with_payload("foo", "1.0", "changed"),
    );
    assert!(installer.install_or_update(&path, false).is_none());
    assert!(host.events().is_empty());
}

#[test]
fn known_path_updates_present_module() {
    let temp = TempDir::new().unwrap();
    let path = write_file(temp.path(), "foo-1.0.jar", &module_jar("foo", "1.0"));
    let (host, installer) = host_and_installer();
    let module = installer.install_or_update(&path, false).unwrap();
    module.start().unwrap();
    host.clear_events();

    let new_content = module_jar_with_payload("foo", "1.0", "a much longer replacement payload");
    write_file(temp.path(), "foo-1.0.jar", &new_content);
    let updated = installer.install_or_update(&path, true).expect("updated");

    assert_eq!(updated.location(), &loc("foo:1.0"));
    assert_eq!(
        host.events(),
        vec![
            HostEvent::Stopped(loc("foo:1.0")),
            HostEvent::Updated(loc("foo:1.0")),
            HostEvent::Started(loc("foo:1.0")),
        ]
    );
    assert_eq!(host.module(&loc("foo:1.0")).unwrap().size(), new_content.len());
}

#[test]
fn version_bump_installs_a_new_identity() {
    let temp = TempDir::new().unwrap();
    let old = write_file(temp.path(), "foo-1.0.jar", &module_jar("foo", "1.0"));
    let (host, installer) = host_and_installer();
    installer.install_or_update(&old, false).unwrap();
    host.clear_events();

    let new = write_file(temp.path(), "foo-1.1.jar", &module_jar("foo", "1.1"));
    let module = installer.install_or_update(&new, true).expect("installed");

    assert_eq!(module.location(), &loc("foo:1.1"));
    assert_eq!(host.events(), vec![HostEvent::Installed(loc("foo:1.1"))]);
    assert_eq!(host.locations(), vec![loc("foo:1.0"), loc("foo:1.1")]);
}

#[test]
fn failed_update_yields_no_handle_and_stops_the_sequence() {
    let temp = TempDir::new().unwrap();
    let path = write_file(temp.path(), "foo-1.0.jar", &module_jar("foo", "1.0"));
    let (host, installer) = host_and_installer();
    installer.install_or_update(&path, false).unwrap();
    host.fail_stop(loc("foo:1.0"));
    host.clear_events();

    assert!(installer.install_or_update(&path, true).is_none());
    assert!(host.events().is_empty());
}

#[test]
fn plain_archive_is_wrapped_under_its_file_name() {
    let temp = TempDir::new().unwrap();
    let path = write_file(temp.path(), "plainlib.jar", &plain_jar());
    let (host, installer) = host_and_installer();

    let module = installer.install_or_update(&path, false).expect("wrapped");

    assert_eq!(module.location(), &loc("plainlib.jar"));
    assert_eq!(module.symbolic_name().as_deref(), Some("plainlib.jar"));

    // A known plain archive is never updated
    host.clear_events();
    assert!(installer.install_or_update(&path, true).is_none());
    assert!(host.events().is_empty());
}

#[test]
fn missing_file_yields_nothing() {
    let temp = TempDir::new().unwrap();
    let (host, installer) = host_and_installer();

    assert!(
        installer
            .install_or_update(&temp.path().join("gone.jar"), false)
            .is_none()
    );
    assert!(host.events().is_empty());
}

#[test]
fn concurrent_updates_of_one_identity_never_interleave() {
    let temp = TempDir::new().unwrap();
    let (host, installer) = host_and_installer();
    let first = write_file(temp.path(), "foo-0.jar", &module_jar("foo", "1.0"));
    installer.install_or_update(&first, false).unwrap().start().unwrap();
    host.clear_events();

    let paths: Vec<_> = (0..4)
        .map(|i| {
            write_file(
                temp.path(),
                &format!("foo-{}.jar", i + 1),
                &module_jar_with_payload("foo", "1.0", &format!("payload {}", i)),
            )
        })
        .collect();

    let handles: Vec<_> = paths
        .into_iter()
        .map(|path| {
            let installer = Arc::clone(&installer);
            thread::spawn(move || {
                for _ in 0..5 {
                    installer.install_or_update(&path, true).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let events = host.events();
    assert_eq!(events.len(), 4 * 5 * 3);
    for chunk in events.chunks(3) {
        assert_eq!(
            chunk,
            [
                HostEvent::Stopped(loc("foo:1.0")),
                HostEvent::Updated(loc("foo:1.0")),
                HostEvent::Started(loc("foo:1.0")),
            ]
        );
    }
}
