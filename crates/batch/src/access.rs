//! Scoped access to files and folders.
//!
//! Some platforms only let an application touch a user-selected file or
//! folder between an explicit "begin access" and "end access" call. Inputs
//! and the output folder are therefore handed to the orchestrator as
//! [`ScopedResource`]s, and are only ever touched while an [`AccessGuard`]
//! is alive. The guard ends access when dropped, so the bracket is closed on
//! every exit path: early returns, failures and panics alike.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Shared handle to a scoped resource.
pub type ResourceHandle = Arc<dyn ScopedResource>;

/// A file or folder that must be explicitly opened for access before use.
///
/// `begin_access` and `end_access` must be called in balanced pairs; use
/// [`AccessGuard::acquire`] rather than calling them directly.
pub trait ScopedResource: Send + Sync {
    /// Location of the resource on the filesystem.
    fn path(&self) -> &Path;

    /// Request access. Returning `false` means the resource can't be used,
    /// and `end_access` must not be called.
    fn begin_access(&self) -> bool;

    /// Give back access obtained from a successful `begin_access`.
    fn end_access(&self);
}

/// An open access bracket on a [`ScopedResource`], closed on drop.
#[must_use = "access ends as soon as the guard is dropped"]
pub struct AccessGuard<'a> {
    resource: &'a dyn ScopedResource,
}
impl<'a> AccessGuard<'a> {
    /// Begin access, returning `None` if it was refused.
    pub fn acquire(resource: &'a dyn ScopedResource) -> Option<Self> {
        if !resource.begin_access() {
            tracing::debug!(path = %resource.path().display(), "Access refused");
            return None;
        }
        tracing::trace!(path = %resource.path().display(), "Access granted");
        Some(Self { resource })
    }
}
impl Drop for AccessGuard<'_> {
    fn drop(&mut self) {
        self.resource.end_access();
        tracing::trace!(path = %self.resource.path().display(), "Access released");
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    File,
    /// Only listed, never written to.
    SourceDirectory,
    Directory,
}

/// A plain filesystem resource.
///
/// There is no sandbox to negotiate with on a regular filesystem, so
/// beginning access means checking the resource is actually usable: a file
/// must be openable for reading, a folder to scan must be listable, and an
/// output directory must be listable and accept new files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalResource {
    path: PathBuf,
    kind: Kind,
}
impl LocalResource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), kind: Kind::File }
    }

    /// A folder that converted files are written into.
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), kind: Kind::Directory }
    }

    /// A folder that is only scanned for inputs.
    pub fn source_directory(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), kind: Kind::SourceDirectory }
    }

    pub fn into_handle(self) -> ResourceHandle {
        Arc::new(self)
    }
}
impl ScopedResource for LocalResource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn begin_access(&self) -> bool {
        match self.kind {
            Kind::File => fs::File::open(&self.path).and_then(|f| f.metadata()).is_ok_and(|m| m.is_file()),
            Kind::SourceDirectory => fs::read_dir(&self.path).is_ok(),
            // Permission bits say nothing about ownership or ACLs; actually try a write.
            Kind::Directory => {
                fs::read_dir(&self.path).is_ok() && tempfile::NamedTempFile::new_in(&self.path).is_ok()
            },
        }
    }

    fn end_access(&self) {}
}

/// Wraps a resource shared between concurrently running items so that its
/// `begin_access`/`end_access` calls never interleave.
pub(crate) struct Serialized {
    inner: ResourceHandle,
    lock: Mutex<()>,
}
impl Serialized {
    pub(crate) fn new(inner: ResourceHandle) -> Self {
        Self { inner, lock: Mutex::new(()) }
    }
}
impl ScopedResource for Serialized {
    fn path(&self) -> &Path {
        self.inner.path()
    }

    fn begin_access(&self) -> bool {
        // A poisoned lock only means another item panicked mid-call; the
        // unit value inside can't be left inconsistent.
        let _lock = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.inner.begin_access()
    }

    fn end_access(&self) {
        let _lock = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.inner.end_access();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockResource;

    #[test]
    fn test_guard_releases_on_drop() {
        let resource = MockResource::new("/in/a.cr2");
        {
            let _guard = AccessGuard::acquire(&*resource).unwrap();
            assert_eq!(resource.active(), 1);
        }
        assert_eq!(resource.active(), 0);
        assert_eq!(resource.grants(), 1);
        assert!(resource.is_balanced());
    }

    #[test]
    fn test_refused_access_is_never_released() {
        let resource = MockResource::denied("/in/a.cr2");
        assert!(AccessGuard::acquire(&*resource).is_none());
        assert_eq!(resource.attempts(), 1);
        assert_eq!(resource.grants(), 0);
        assert_eq!(resource.releases(), 0);
    }

    #[test]
    fn test_guard_releases_on_panic() {
        let resource = MockResource::new("/in/a.cr2");
        let cloned = resource.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = AccessGuard::acquire(&*cloned).unwrap();
            panic!("converter blew up");
        });
        assert!(result.is_err());
        assert!(resource.is_balanced());
        assert_eq!(resource.releases(), 1);
    }

    #[test]
    fn test_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.cr2");
        std::fs::write(&path, b"raw").unwrap();
        assert!(LocalResource::file(&path).begin_access());
        assert!(!LocalResource::file(dir.path().join("missing.cr2")).begin_access());
        // A directory is not a file.
        assert!(!LocalResource::file(dir.path()).begin_access());
    }

    #[test]
    fn test_local_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.cr2");
        std::fs::write(&file, b"raw").unwrap();
        assert!(LocalResource::directory(dir.path()).begin_access());
        assert!(!LocalResource::directory(dir.path().join("missing")).begin_access());
        assert!(!LocalResource::directory(&file).begin_access());
        // The write check leaves nothing behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_local_source_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.cr2");
        std::fs::write(&file, b"raw").unwrap();
        assert!(LocalResource::source_directory(dir.path()).begin_access());
        assert!(!LocalResource::source_directory(dir.path().join("missing")).begin_access());
        assert!(!LocalResource::source_directory(&file).begin_access());
    }

    #[cfg(unix)]
    #[test]
    fn test_local_directory_follows_real_writability() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        // Privileged users may still write here; the answer must match reality either way.
        let writable = tempfile::NamedTempFile::new_in(&locked).is_ok();
        assert_eq!(LocalResource::directory(&locked).begin_access(), writable);
        // Scanning only needs to list it.
        assert!(LocalResource::source_directory(&locked).begin_access());

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_serialized_forwards() {
        let inner = MockResource::new("/out");
        let serialized = Serialized::new(inner.clone());
        assert_eq!(serialized.path(), Path::new("/out"));
        {
            let _a = AccessGuard::acquire(&serialized).unwrap();
            let _b = AccessGuard::acquire(&serialized).unwrap();
            assert_eq!(inner.active(), 2);
        }
        assert!(inner.is_balanced());
        assert_eq!(inner.overlaps(), 0);
    }
}
