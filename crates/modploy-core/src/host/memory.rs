//! In-process host runtime
//!
//! Keeps installed modules in memory and journals every lifecycle call.
//! Used for dry runs from the CLI and as the host in tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::{HostError, HostRuntime, ModuleHandle, ModuleRef};
use crate::archive::{ArchiveMetadata, read_manifest};
use crate::location::LocationId;

/// A lifecycle call observed by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Installed(LocationId),
    Started(LocationId),
    Stopped(LocationId),
    Updated(LocationId),
    HostStopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Installed,
    Active,
}

#[derive(Debug, Default)]
struct Journal {
    events: Mutex<Vec<HostEvent>>,
    failing_starts: Mutex<HashSet<LocationId>>,
    failing_stops: Mutex<HashSet<LocationId>>,
}

impl Journal {
    fn record(&self, event: HostEvent) {
        tracing::debug!(?event, "Host runtime call");
        self.events.lock().push(event);
    }
}

#[derive(Debug)]
pub struct MemoryHost {
    modules: Mutex<BTreeMap<LocationId, Arc<MemoryModule>>>,
    journal: Arc<Journal>,
    shutdown: CancellationToken,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            modules: Mutex::new(BTreeMap::new()),
            journal: Arc::new(Journal::default()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token cancelled once the host has been asked to stop
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Every lifecycle call so far, in order
    pub fn events(&self) -> Vec<HostEvent> {
        self.journal.events.lock().clone()
    }

    pub fn clear_events(&self) {
        self.journal.events.lock().clear();
    }

    /// Installed location identities, sorted
    pub fn locations(&self) -> Vec<LocationId> {
        self.modules.lock().keys().cloned().collect()
    }

    pub fn module(&self, location: &LocationId) -> Option<Arc<MemoryModule>> {
        self.modules.lock().get(location).cloned()
    }

    /// Make every later `start` of this module fail
    pub fn fail_start(&self, location: LocationId) {
        self.journal.failing_starts.lock().insert(location);
    }

    /// Make every later `stop` of this module fail
    pub fn fail_stop(&self, location: LocationId) {
        self.journal.failing_stops.lock().insert(location);
    }
}

impl HostRuntime for MemoryHost {
    fn install(&self, location: &LocationId, content: Vec<u8>) -> Result<ModuleRef, HostError> {
        if self.is_stopped() {
            return Err(HostError::ShuttingDown);
        }

        let mut modules = self.modules.lock();
        if let Some(existing) = modules.get(location) {
            let module: ModuleRef = existing.clone();
            return Ok(module);
        }

        let identity = module_identity(location, &content)?;
        let module = Arc::new(MemoryModule {
            location: location.clone(),
            journal: Arc::clone(&self.journal),
            inner: Mutex::new(ModuleContent {
                symbolic_name: identity.0,
                version: identity.1,
                size: content.len(),
                state: ModuleState::Installed,
            }),
        });
        modules.insert(location.clone(), Arc::clone(&module));
        self.journal.record(HostEvent::Installed(location.clone()));

        Ok(module)
    }

    fn lookup(&self, location: &LocationId) -> Option<ModuleRef> {
        self.modules
            .lock()
            .get(location)
            .map(|module| -> ModuleRef { module.clone() })
    }

    fn stop_host(&self) -> Result<(), HostError> {
        if !self.shutdown.is_cancelled() {
            self.journal.record(HostEvent::HostStopped);
            self.shutdown.cancel();
        }
        Ok(())
    }
}

#[derive(Debug)]
struct ModuleContent {
    symbolic_name: String,
    version: Option<String>,
    size: usize,
    state: ModuleState,
}

/// A module held by [`MemoryHost`]
#[derive(Debug)]
pub struct MemoryModule {
    location: LocationId,
    journal: Arc<Journal>,
    inner: Mutex<ModuleContent>,
}

impl MemoryModule {
    pub fn state(&self) -> ModuleState {
        self.inner.lock().state
    }

    pub fn version(&self) -> Option<String> {
        self.inner.lock().version.clone()
    }

    /// Size in bytes of the installed content
    pub fn size(&self) -> usize {
        self.inner.lock().size
    }
}

impl ModuleHandle for MemoryModule {
    fn location(&self) -> &LocationId {
        &self.location
    }

    fn symbolic_name(&self) -> Option<String> {
        Some(self.inner.lock().symbolic_name.clone())
    }

    fn start(&self) -> Result<(), HostError> {
        if self.journal.failing_starts.lock().contains(&self.location) {
            return Err(HostError::StartFailed {
                location: self.location.to_string(),
                reason: "activation refused".to_string(),
            });
        }

        let mut inner = self.inner.lock();
        if inner.state != ModuleState::Active {
            inner.state = ModuleState::Active;
            self.journal.record(HostEvent::Started(self.location.clone()));
        }
        Ok(())
    }

    fn stop(&self) -> Result<(), HostError> {
        if self.journal.failing_stops.lock().contains(&self.location) {
            return Err(HostError::StopFailed {
                location: self.location.to_string(),
                reason: "deactivation refused".to_string(),
            });
        }

        let mut inner = self.inner.lock();
        if inner.state == ModuleState::Active {
            inner.state = ModuleState::Installed;
            self.journal.record(HostEvent::Stopped(self.location.clone()));
        }
        Ok(())
    }

    fn update(&self, content: Vec<u8>) -> Result<(), HostError> {
        let (symbolic_name, version) = module_identity(&self.location, &content)?;

        let mut inner = self.inner.lock();
        inner.symbolic_name = symbolic_name;
        inner.version = version;
        inner.size = content.len();
        self.journal.record(HostEvent::Updated(self.location.clone()));
        Ok(())
    }
}

/// Symbolic name and version of module content, refusing plain archives
fn module_identity(
    location: &LocationId,
    content: &[u8],
) -> Result<(String, Option<String>), HostError> {
    let invalid = |reason: String| HostError::InvalidContent {
        location: location.to_string(),
        reason,
    };

    let manifest = read_manifest(content)
        .map_err(|e| invalid(e.to_string()))?
        .ok_or_else(|| invalid("missing manifest".to_string()))?;
    let metadata = ArchiveMetadata::from_manifest(&manifest);
    let symbolic_name = metadata
        .symbolic_name
        .ok_or_else(|| invalid("missing symbolic name".to_string()))?;

    Ok((symbolic_name, metadata.version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn module_zip(name: &str, version: &str) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            zip.start_file(
                crate::archive::manifest::MANIFEST_PATH,
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
            write!(
                zip,
                "Manifest-Version: 1.0\r\nBundle-SymbolicName: {}\r\nBundle-Version: {}\r\n\r\n",
                name, version
            )
            .unwrap();
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn install_then_lookup() {
        let host = MemoryHost::new();
        let location = LocationId::new("foo:1.0");

        let module = host.install(&location, module_zip("foo", "1.0")).unwrap();
        assert_eq!(module.symbolic_name().as_deref(), Some("foo"));
        assert!(host.lookup(&location).is_some());
        assert_eq!(host.events(), vec![HostEvent::Installed(location)]);
    }

    #[test]
    fn install_rejects_plain_content() {
        let host = MemoryHost::new();
        let err = host
            .install(&LocationId::new("lib.jar"), b"not a zip".to_vec())
            .unwrap_err();
        assert!(matches!(err, HostError::InvalidContent { .. }));
        assert!(host.locations().is_empty());
    }

    #[test]
    fn install_of_bound_location_returns_existing_module() {
        let host = MemoryHost::new();
        let location = LocationId::new("foo:1.0");
        host.install(&location, module_zip("foo", "1.0")).unwrap();
        host.install(&location, module_zip("foo", "1.0")).unwrap();
        assert_eq!(host.events().len(), 1);
    }

    #[test]
    fn start_is_idempotent() {
        let host = MemoryHost::new();
        let location = LocationId::new("foo:1.0");
        let module = host.install(&location, module_zip("foo", "1.0")).unwrap();

        module.start().unwrap();
        module.start().unwrap();

        let started = host
            .events()
            .iter()
            .filter(|e| matches!(e, HostEvent::Started(_)))
            .count();
        assert_eq!(started, 1);
        assert_eq!(host.module(&location).unwrap().state(), ModuleState::Active);
    }

    #[test]
    fn update_replaces_content() {
        let host = MemoryHost::new();
        let location = LocationId::new("foo");
        let module = host.install(&location, module_zip("foo", "1.0")).unwrap();

        module.update(module_zip("foo", "2.0")).unwrap();
        assert_eq!(host.module(&location).unwrap().version().as_deref(), Some("2.0"));
    }

    #[test]
    fn injected_failures_surface_as_errors() {
        let host = MemoryHost::new();
        let location = LocationId::new("foo:1.0");
        let module = host.install(&location, module_zip("foo", "1.0")).unwrap();
        host.fail_start(location.clone());
        host.fail_stop(location);

        assert!(matches!(module.start(), Err(HostError::StartFailed { .. })));
        assert!(matches!(module.stop(), Err(HostError::StopFailed { .. })));
    }

    #[test]
    fn stop_host_cancels_token_and_refuses_installs() {
        let host = MemoryHost::new();
        let token = host.shutdown_token();

        host.stop_host().unwrap();
        host.stop_host().unwrap();

        assert!(token.is_cancelled());
        assert_eq!(host.events(), vec![HostEvent::HostStopped]);
        let err = host
            .install(&LocationId::new("foo:1.0"), module_zip("foo", "1.0"))
            .unwrap_err();
        assert_eq!(err, HostError::ShuttingDown);
    }
}
