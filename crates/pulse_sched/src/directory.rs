//! The update directory — group-keyed forwarding table with pre-bind
//! queuing.
//!
//! Producers register tickables against a [`GroupId`]; the directory either
//! forwards the request to the group's bound updater immediately or queues
//! it until an updater binds. Binding flushes the queue, so "register
//! before the consumer exists" works without coordination between the two
//! sides.
//!
//! The directory is an explicit object shared by handle (`Arc`), with its
//! lifetime decided by the host — not a process-wide singleton. The group
//! tables are concurrent maps so lookups may come from any thread; the
//! per-group pending bookkeeping still assumes producers coordinate on one
//! logical thread, the cooperative model this whole workspace targets.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, trace};

use pulse_tick::{GroupId, TickHandle, UpdateGroup};

use crate::error::DirectoryError;

/// A forwarding callback installed by a bound updater.
pub type ForwardFn = Arc<dyn Fn(TickHandle) + Send + Sync>;

/// The callback pair a bound updater installs for its group.
struct Binding {
    register: ForwardFn,
    unregister: ForwardFn,
}

/// Requests that arrived for a group while no updater was bound.
#[derive(Default)]
struct PendingSets {
    add: HashSet<TickHandle>,
    remove: HashSet<TickHandle>,
}

/// Directory mapping update groups to their bound updater's entry points.
///
/// At most one updater may be bound per group at any time. Registrations
/// against an unbound group queue with last-call-wins semantics and are
/// flushed into the updater when one binds.
#[derive(Default)]
pub struct UpdateDirectory {
    /// Live bindings keyed by group.
    bindings: DashMap<GroupId, Binding>,
    /// Pre-bind queues keyed by group.
    pending: DashMap<GroupId, PendingSets>,
}

impl UpdateDirectory {
    /// Create a new empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a forwarding pair for `group` and flush its pre-bind queue.
    ///
    /// Queued adds are forwarded to `register` (handles whose target has
    /// already been dropped are skipped), then queued removes to
    /// `unregister`; both queues are cleared regardless of what the
    /// callbacks do with them.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::AlreadyBound`] if the group already has a
    /// live binding. Unbind the previous updater first.
    pub fn bind(
        &self,
        group: GroupId,
        register: ForwardFn,
        unregister: ForwardFn,
    ) -> Result<(), DirectoryError> {
        match self.bindings.entry(group) {
            Entry::Occupied(_) => return Err(DirectoryError::AlreadyBound(group)),
            Entry::Vacant(slot) => {
                slot.insert(Binding {
                    register: Arc::clone(&register),
                    unregister: Arc::clone(&unregister),
                });
            }
        }
        debug!(group = %group, "update group bound");
        self.flush_pending(group, &register, &unregister);
        Ok(())
    }

    /// Forward a group's queued requests into a freshly bound pair.
    fn flush_pending(&self, group: GroupId, register: &ForwardFn, unregister: &ForwardFn) {
        let Some((_, sets)) = self.pending.remove(&group) else {
            return;
        };
        let (adds, removes) = (sets.add.len(), sets.remove.len());
        for handle in sets.add {
            if handle.is_alive() {
                register(handle);
            }
        }
        for handle in sets.remove {
            unregister(handle);
        }
        if adds + removes > 0 {
            debug!(group = %group, adds, removes, "flushed pre-bind queue");
        }
    }

    /// Remove the binding for `group` if `register`/`unregister` are the
    /// exact pair currently bound.
    ///
    /// Pointer identity is the guard: a late unbind from an updater that
    /// already lost its group (or never had it) returns `false` and leaves
    /// the live binding untouched, so a disposed updater can never clobber
    /// a newer one that reused its group.
    pub fn unbind(&self, group: GroupId, register: &ForwardFn, unregister: &ForwardFn) -> bool {
        match self.bindings.entry(group) {
            Entry::Occupied(slot) => {
                let bound = slot.get();
                if Arc::ptr_eq(&bound.register, register)
                    && Arc::ptr_eq(&bound.unregister, unregister)
                {
                    slot.remove();
                    debug!(group = %group, "update group unbound");
                    true
                } else {
                    debug!(group = %group, "stale unbind ignored");
                    false
                }
            }
            Entry::Vacant(_) => false,
        }
    }

    /// Register `handle` under `group`.
    ///
    /// Forwards immediately if the group is bound; otherwise queues with
    /// last-call-wins semantics (a register supersedes a queued unregister
    /// for the same handle).
    pub fn register(&self, group: GroupId, handle: TickHandle) {
        let forward = self.bindings.get(&group).map(|b| Arc::clone(&b.register));
        match forward {
            Some(forward) => forward(handle),
            None => {
                let mut sets = self.pending.entry(group).or_default();
                sets.remove.remove(&handle);
                sets.add.insert(handle);
                trace!(group = %group, "queued register for unbound group");
            }
        }
    }

    /// Unregister `handle` from `group`.
    ///
    /// Symmetric to [`UpdateDirectory::register`]: forwards immediately if
    /// bound, otherwise a queued unregister supersedes a queued register.
    pub fn unregister(&self, group: GroupId, handle: TickHandle) {
        let forward = self.bindings.get(&group).map(|b| Arc::clone(&b.unregister));
        match forward {
            Some(forward) => forward(handle),
            None => {
                let mut sets = self.pending.entry(group).or_default();
                sets.add.remove(&handle);
                sets.remove.insert(handle);
                trace!(group = %group, "queued unregister for unbound group");
            }
        }
    }

    /// Register `handle` under the marker group `G`.
    pub fn register_in<G: UpdateGroup>(&self, handle: TickHandle) {
        self.register(GroupId::of::<G>(), handle);
    }

    /// Unregister `handle` from the marker group `G`.
    pub fn unregister_in<G: UpdateGroup>(&self, handle: TickHandle) {
        self.unregister(GroupId::of::<G>(), handle);
    }

    /// Drop any queued pre-bind requests for `group`.
    ///
    /// Returns `true` if at least one queued request was dropped.
    pub fn clear_pending(&self, group: GroupId) -> bool {
        self.pending
            .remove(&group)
            .is_some_and(|(_, sets)| !sets.add.is_empty() || !sets.remove.is_empty())
    }

    /// Returns `true` if an updater is currently bound for `group`.
    #[must_use]
    pub fn is_bound(&self, group: GroupId) -> bool {
        self.bindings.contains_key(&group)
    }

    /// Number of queued pre-bind requests (adds plus removes) for `group`.
    #[must_use]
    pub fn pending_count(&self, group: GroupId) -> usize {
        self.pending
            .get(&group)
            .map_or(0, |sets| sets.add.len() + sets.remove.len())
    }
}

impl std::fmt::Debug for UpdateDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateDirectory")
            .field("bound_groups", &self.bindings.len())
            .field("pending_groups", &self.pending.len())
            .finish()
    }
}
