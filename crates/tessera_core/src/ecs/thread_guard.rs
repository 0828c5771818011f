//! Single-owner thread check

use std::thread::{self, ThreadId};

/// Remembers the thread that owns a world and panics when another thread
/// touches it. Disabled guards never check.
#[derive(Debug, Clone)]
pub(crate) struct ThreadGuard {
    owner: ThreadId,
    enabled: bool,
}

impl ThreadGuard {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            owner: thread::current().id(),
            enabled,
        }
    }

    #[inline]
    #[track_caller]
    pub(crate) fn check(&self) {
        if self.enabled && thread::current().id() != self.owner {
            panic!(
                "world owned by {:?} accessed from {:?}; call bind_to_current_thread after moving it",
                self.owner,
                thread::current().id()
            );
        }
    }

    pub(crate) fn rebind(&mut self) {
        self.owner = thread::current().id();
    }
}
