//! Test doubles shared by the unit tests of this crate.

use crate::access::ScopedResource;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};

/// A [`ScopedResource`] that counts its access brackets.
///
/// Also detects two `begin_access`/`end_access` calls running at the same
/// time, which must never happen for a shared output folder.
pub(crate) struct MockResource {
    path: PathBuf,
    deny: bool,
    attempts: AtomicUsize,
    grants: AtomicUsize,
    releases: AtomicUsize,
    active: AtomicIsize,
    in_call: AtomicBool,
    overlaps: AtomicUsize,
}

impl MockResource {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self::build(path.into(), false))
    }

    pub(crate) fn denied(path: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self::build(path.into(), true))
    }

    fn build(path: PathBuf, deny: bool) -> Self {
        Self {
            path,
            deny,
            attempts: AtomicUsize::new(0),
            grants: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            active: AtomicIsize::new(0),
            in_call: AtomicBool::new(false),
            overlaps: AtomicUsize::new(0),
        }
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn grants(&self) -> usize {
        self.grants.load(Ordering::SeqCst)
    }

    pub(crate) fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub(crate) fn active(&self) -> isize {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub(crate) fn is_balanced(&self) -> bool {
        self.grants() == self.releases() && self.active() == 0
    }

    fn enter(&self) {
        if self.in_call.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        // Widen the window so unsynchronized callers actually collide.
        std::thread::yield_now();
    }

    fn leave(&self) {
        self.in_call.store(false, Ordering::SeqCst);
    }
}

impl ScopedResource for MockResource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn begin_access(&self) -> bool {
        self.enter();
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let granted = !self.deny;
        if granted {
            self.grants.fetch_add(1, Ordering::SeqCst);
            self.active.fetch_add(1, Ordering::SeqCst);
        }
        self.leave();
        granted
    }

    fn end_access(&self) {
        self.enter();
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.leave();
    }
}
