#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use modploy_core::host::{HostEvent, HostRuntime, MemoryHost};
use modploy_core::install::ModuleInstaller;
use modploy_core::location::LocationId;

const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

fn zip_with(manifest: Option<String>, payload: &str) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        let options = zip::write::SimpleFileOptions::default();
        if let Some(manifest) = manifest {
            zip.start_file(MANIFEST_PATH, options).unwrap();
            zip.write_all(manifest.as_bytes()).unwrap();
        }
        zip.start_file("payload.txt", options).unwrap();
        zip.write_all(payload.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf.into_inner()
}

/// Module archive with a symbolic name and version
pub fn module_jar(name: &str, version: &str) -> Vec<u8> {
    module_jar_with_payload(name, version, "payload")
}

/// Module archive whose content differs by `payload`
pub fn module_jar_with_payload(name: &str, version: &str, payload: &str) -> Vec<u8> {
    zip_with(
        Some(format!(
            "Manifest-Version: 1.0\r\nBundle-ManifestVersion: 2\r\nBundle-SymbolicName: {}\r\nBundle-Version: {}\r\n\r\n",
            name, version
        )),
        payload,
    )
}

/// Plain library archive without module metadata
pub fn plain_jar() -> Vec<u8> {
    zip_with(Some("Manifest-Version: 1.0\r\nCreated-By: test\r\n\r\n".to_string()), "lib")
}

/// Archive asking the host runtime to stop
pub fn stop_jar() -> Vec<u8> {
    zip_with(
        Some("Manifest-Version: 1.0\r\nModploy-Stop-Host: true\r\n\r\n".to_string()),
        "stop",
    )
}

/// Bytes that are not a zip archive at all
pub fn corrupt_jar() -> Vec<u8> {
    b"PK\x03\x04 truncated garbage".to_vec()
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    path
}

pub fn host_and_installer() -> (Arc<MemoryHost>, Arc<ModuleInstaller>) {
    let host = Arc::new(MemoryHost::new());
    let dyn_host: Arc<dyn HostRuntime> = host.clone();
    let installer = Arc::new(ModuleInstaller::new(dyn_host, "jar"));
    (host, installer)
}

pub fn loc(id: &str) -> LocationId {
    LocationId::new(id)
}

pub fn installed(host: &MemoryHost) -> Vec<LocationId> {
    host.events()
        .into_iter()
        .filter_map(|event| match event {
            HostEvent::Installed(location) => Some(location),
            _ => None,
        })
        .collect()
}

pub fn started(host: &MemoryHost) -> Vec<LocationId> {
    host.events()
        .into_iter()
        .filter_map(|event| match event {
            HostEvent::Started(location) => Some(location),
            _ => None,
        })
        .collect()
}

/// Every started module was installed earlier in the journal
pub fn assert_installed_before_started(host: &MemoryHost) {
    let events = host.events();
    for (idx, event) in events.iter().enumerate() {
        if let HostEvent::Started(location) = event {
            let installed_before = events[..idx]
                .iter()
                .any(|e| matches!(e, HostEvent::Installed(l) if l == location));
            assert!(installed_before, "{} started before install", location);
        }
    }
}

/// Poll `check` until it holds or the timeout expires
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(10);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    check()
}
