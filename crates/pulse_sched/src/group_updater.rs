//! The group-scoped updater.
//!
//! A [`GroupUpdater`] is an [`Updater`] that owns exactly one group for its
//! whole lifetime: it installs its forwarding pair into the directory at
//! construction and withdraws it on drop, on every exit path, so a group
//! binding can never outlive the thing that ticks it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;
use uuid::Uuid;

use pulse_tick::{GroupId, TickHandle, UpdateGroup, Updater};

use crate::directory::{ForwardFn, UpdateDirectory};
use crate::error::DirectoryError;

/// An updater bound to one update group.
///
/// Producers usually reach it through [`UpdateDirectory::register`] rather
/// than holding it directly; the host holds the `GroupUpdater` and calls
/// [`GroupUpdater::tick`] once per cycle.
pub struct GroupUpdater {
    group: GroupId,
    /// Unique instance identifier, for log correlation across rebinds.
    instance_id: Uuid,
    directory: Arc<UpdateDirectory>,
    inner: Arc<Mutex<Updater>>,
    register_fn: ForwardFn,
    unregister_fn: ForwardFn,
}

/// A panicking tickable must not wedge its whole group; recover the state.
fn lock(inner: &Mutex<Updater>) -> MutexGuard<'_, Updater> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl GroupUpdater {
    /// Bind a new updater for `group` in `directory`.
    ///
    /// Requests queued for `group` before this call are flushed into the
    /// new updater's pending sets and take effect at the first tick.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::AlreadyBound`] if the group already has a
    /// live updater.
    pub fn bind(directory: Arc<UpdateDirectory>, group: GroupId) -> Result<Self, DirectoryError> {
        let inner = Arc::new(Mutex::new(Updater::new()));

        let register_fn: ForwardFn = {
            let inner = Arc::clone(&inner);
            Arc::new(move |handle| lock(&inner).register(handle))
        };
        let unregister_fn: ForwardFn = {
            let inner = Arc::clone(&inner);
            Arc::new(move |handle| lock(&inner).unregister(handle))
        };

        directory.bind(group, Arc::clone(&register_fn), Arc::clone(&unregister_fn))?;

        let instance_id = Uuid::new_v4();
        debug!(group = %group, instance_id = %instance_id, "group updater bound");

        Ok(Self {
            group,
            instance_id,
            directory,
            inner,
            register_fn,
            unregister_fn,
        })
    }

    /// Bind a new updater for the marker group `G`.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::AlreadyBound`] if the group already has a
    /// live updater.
    pub fn bind_group<G: UpdateGroup>(
        directory: Arc<UpdateDirectory>,
    ) -> Result<Self, DirectoryError> {
        Self::bind(directory, GroupId::of::<G>())
    }

    /// The group this updater owns.
    #[must_use]
    pub fn group(&self) -> GroupId {
        self.group
    }

    /// Unique id of this updater instance.
    #[must_use]
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Queue a handle for admission at the next cycle boundary.
    pub fn register(&self, handle: TickHandle) {
        lock(&self.inner).register(handle);
    }

    /// Queue a handle for removal at the next cycle boundary.
    pub fn unregister(&self, handle: TickHandle) {
        lock(&self.inner).unregister(handle);
    }

    /// Run one cycle over the group.
    ///
    /// The pending sets are committed and the active set snapshotted under
    /// the lock; the snapshot is invoked with the lock released, so a
    /// tickable may register or unregister (itself or others, directly or
    /// through the directory) during its own tick. Such calls land in the
    /// pending sets and take effect next cycle.
    pub fn tick(&self) {
        let snapshot = lock(&self.inner).commit_pending();
        for tickable in snapshot {
            tickable.tick();
        }
    }

    /// Number of handles in the group's active set.
    #[must_use]
    pub fn active_count(&self) -> usize {
        lock(&self.inner).active_count()
    }
}

impl Drop for GroupUpdater {
    fn drop(&mut self) {
        let removed = self
            .directory
            .unbind(self.group, &self.register_fn, &self.unregister_fn);
        debug!(
            group = %self.group,
            instance_id = %self.instance_id,
            removed,
            "group updater dropped"
        );
    }
}

impl std::fmt::Debug for GroupUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupUpdater")
            .field("group", &self.group)
            .field("instance_id", &self.instance_id)
            .field("active", &self.active_count())
            .finish()
    }
}
