//! Scheduling-layer error types.

use pulse_tick::GroupId;

/// Errors that can occur when binding updaters into a directory.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// A live updater already owns this group. Unbind it (or drop its
    /// [`GroupUpdater`](crate::GroupUpdater)) before binding another.
    #[error("an updater is already bound for {0}")]
    AlreadyBound(GroupId),
}
