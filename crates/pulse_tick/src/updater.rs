//! The plain single-instance updater.
//!
//! [`Updater`] drives one flat set of tickables. Registration and
//! unregistration go through two staging sets and are committed only at the
//! next cycle boundary, so the active set is never mutated while a cycle is
//! underway, and a register/unregister pair issued between two ticks
//! resolves to whichever call came last.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::trace;

use crate::handle::{TickHandle, Tickable};

/// A single-instance updater with deferred, double-buffered mutation.
///
/// The host calls [`Updater::tick`] once per cycle; producers call
/// [`Updater::register`] and [`Updater::unregister`] at any point between
/// cycles. Invariants at the start of every tick: the two staging sets are
/// disjoint, and nothing queued for admission is already active.
#[derive(Debug, Default)]
pub struct Updater {
    /// Handles ticked every cycle.
    active: HashSet<TickHandle>,
    /// Handles awaiting admission at the next cycle boundary.
    pending_add: HashSet<TickHandle>,
    /// Handles awaiting removal at the next cycle boundary.
    pending_remove: HashSet<TickHandle>,
}

impl Updater {
    /// Create a new empty updater.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a handle for admission at the next cycle boundary.
    ///
    /// A register supersedes a previously queued unregister for the same
    /// handle (last call wins). Registering a handle that is already active
    /// is a no-op.
    pub fn register(&mut self, handle: TickHandle) {
        self.pending_remove.remove(&handle);
        if !self.active.contains(&handle) {
            self.pending_add.insert(handle);
        }
    }

    /// Queue a handle for removal at the next cycle boundary.
    ///
    /// An unregister supersedes a previously queued register for the same
    /// handle (last call wins). Unregistering a handle that was never
    /// registered is a no-op.
    pub fn unregister(&mut self, handle: TickHandle) {
        self.pending_add.remove(&handle);
        self.pending_remove.insert(handle);
    }

    /// Commit queued adds and removes, purge dead handles, and return
    /// strong references to the surviving active set.
    ///
    /// The drain is strict two-phase: every pending add enters `active`,
    /// then every pending remove leaves it, then handles whose target has
    /// been dropped are discarded. The returned snapshot is the cycle's
    /// consistent view; callers invoke it without touching the sets again,
    /// which is what makes re-entrant registration during a tick safe.
    pub fn commit_pending(&mut self) -> Vec<Arc<dyn Tickable>> {
        for handle in self.pending_add.drain() {
            self.active.insert(handle);
        }
        for handle in self.pending_remove.drain() {
            self.active.remove(&handle);
        }

        let before = self.active.len();
        self.active.retain(TickHandle::is_alive);
        if self.active.len() < before {
            trace!(
                purged = before - self.active.len(),
                "purged dead tick handles"
            );
        }

        self.active.iter().filter_map(TickHandle::upgrade).collect()
    }

    /// Run one cycle: commit pending changes, then tick every live handle.
    ///
    /// Iteration order across tickables is unspecified.
    pub fn tick(&mut self) {
        for tickable in self.commit_pending() {
            tickable.tick();
        }
    }

    /// Number of handles currently in the active set.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of handles queued for admission.
    #[must_use]
    pub fn pending_add_count(&self) -> usize {
        self.pending_add.len()
    }

    /// Number of handles queued for removal.
    #[must_use]
    pub fn pending_remove_count(&self) -> usize {
        self.pending_remove.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct Counter {
        ticks: AtomicUsize,
    }

    impl Counter {
        fn count(&self) -> usize {
            self.ticks.load(Ordering::Relaxed)
        }
    }

    impl Tickable for Counter {
        fn tick(&self) {
            self.ticks.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_register_takes_effect_at_next_tick() {
        let counter = Arc::new(Counter::default());
        let mut updater = Updater::new();

        updater.register(TickHandle::new(&counter));
        assert_eq!(updater.active_count(), 0);
        assert_eq!(updater.pending_add_count(), 1);

        updater.tick();
        assert_eq!(counter.count(), 1);
        assert_eq!(updater.active_count(), 1);
        assert_eq!(updater.pending_add_count(), 0);
    }

    #[test]
    fn test_register_then_unregister_never_ticks() {
        // Last call wins: the unregister cancels the queued register.
        let counter = Arc::new(Counter::default());
        let mut updater = Updater::new();

        updater.register(TickHandle::new(&counter));
        updater.unregister(TickHandle::new(&counter));
        updater.tick();

        assert_eq!(counter.count(), 0);
        assert_eq!(updater.active_count(), 0);
    }

    #[test]
    fn test_unregister_then_register_ticks() {
        let counter = Arc::new(Counter::default());
        let mut updater = Updater::new();

        updater.unregister(TickHandle::new(&counter));
        updater.register(TickHandle::new(&counter));
        updater.tick();

        assert_eq!(counter.count(), 1);
        assert_eq!(updater.active_count(), 1);
    }

    #[test]
    fn test_staging_sets_stay_disjoint() {
        let counter = Arc::new(Counter::default());
        let mut updater = Updater::new();

        updater.register(TickHandle::new(&counter));
        updater.unregister(TickHandle::new(&counter));
        assert_eq!(updater.pending_add_count(), 0);
        assert_eq!(updater.pending_remove_count(), 1);

        updater.register(TickHandle::new(&counter));
        assert_eq!(updater.pending_add_count(), 1);
        assert_eq!(updater.pending_remove_count(), 0);
    }

    #[test]
    fn test_tick_twice_reinvokes_same_set() {
        let counter = Arc::new(Counter::default());
        let mut updater = Updater::new();

        updater.register(TickHandle::new(&counter));
        updater.tick();
        updater.tick();

        assert_eq!(counter.count(), 2);
        assert_eq!(updater.active_count(), 1);
    }

    #[test]
    fn test_dead_handle_purged_silently() {
        let survivor = Arc::new(Counter::default());
        let doomed = Arc::new(Counter::default());
        let mut updater = Updater::new();

        updater.register(TickHandle::new(&survivor));
        updater.register(TickHandle::new(&doomed));
        updater.tick();
        assert_eq!(updater.active_count(), 2);

        drop(doomed);
        updater.tick();

        assert_eq!(updater.active_count(), 1);
        assert_eq!(survivor.count(), 2);
    }

    #[test]
    fn test_unregister_active_removes_next_cycle() {
        let counter = Arc::new(Counter::default());
        let mut updater = Updater::new();

        updater.register(TickHandle::new(&counter));
        updater.tick();
        assert_eq!(counter.count(), 1);

        updater.unregister(TickHandle::new(&counter));
        updater.tick();
        assert_eq!(counter.count(), 1);
        assert_eq!(updater.active_count(), 0);
    }

    #[test]
    fn test_register_while_active_is_noop() {
        let counter = Arc::new(Counter::default());
        let mut updater = Updater::new();

        updater.register(TickHandle::new(&counter));
        updater.tick();

        updater.register(TickHandle::new(&counter));
        assert_eq!(updater.pending_add_count(), 0);

        updater.tick();
        assert_eq!(counter.count(), 2);
        assert_eq!(updater.active_count(), 1);
    }

    #[test]
    fn test_double_unregister_is_absorbed() {
        let counter = Arc::new(Counter::default());
        let mut updater = Updater::new();

        updater.unregister(TickHandle::new(&counter));
        updater.unregister(TickHandle::new(&counter));
        updater.tick();

        assert_eq!(updater.active_count(), 0);
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn test_handles_deduplicate_per_target() {
        let counter = Arc::new(Counter::default());
        let mut updater = Updater::new();

        // Two distinct handles to the same allocation collapse to one entry.
        updater.register(TickHandle::new(&counter));
        updater.register(TickHandle::new(&counter));
        updater.tick();

        assert_eq!(counter.count(), 1);
        assert_eq!(updater.active_count(), 1);
    }

    #[test]
    fn test_dead_handle_registered_then_purged() {
        let counter = Arc::new(Counter::default());
        let handle = TickHandle::new(&counter);
        drop(counter);

        let mut updater = Updater::new();
        updater.register(handle);
        updater.tick();

        assert_eq!(updater.active_count(), 0);
    }
}
