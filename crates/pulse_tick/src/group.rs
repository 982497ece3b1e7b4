//! Update-group identity.
//!
//! A [`GroupId`] is derived from the group's **string name** using the
//! FNV-1a 64-bit hash algorithm — deterministic, value-comparable, and free
//! of runtime reflection. Marker types implement [`UpdateGroup`] to issue
//! their id once at compile time.

use serde::{Deserialize, Serialize};

/// A unique identifier for an update group, derived from its string name
/// using the FNV-1a 64-bit hash algorithm.
///
/// Group ids are pure identity — they partition updaters and carry no data
/// of their own. Two ids name the same group exactly when they compare
/// equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct GroupId(pub u64);

impl GroupId {
    /// FNV-1a 64-bit offset basis.
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

    /// FNV-1a 64-bit prime.
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    /// Compute the [`GroupId`] for a group's string name using the FNV-1a
    /// 64-bit hash algorithm.
    ///
    /// This is the canonical way to derive a `GroupId`; the same name
    /// always yields the same id, in any build.
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = Self::FNV_OFFSET_BASIS;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(Self::FNV_PRIME);
            i += 1;
        }
        Self(hash)
    }

    /// Compute the [`GroupId`] for the marker type `G`.
    ///
    /// Hashes `G::group_name()` with FNV-1a, producing the same result as
    /// [`GroupId::from_name`] with the same string.
    #[must_use]
    pub fn of<G: UpdateGroup>() -> Self {
        Self::from_name(G::group_name())
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Group({:#018x})", self.0)
    }
}

/// Marker trait for compile-time update-group tags.
///
/// A group marker is a zero-sized type that is never instantiated; it
/// exists only to name a group in one place and hand out its [`GroupId`].
///
/// # Examples
///
/// ```rust
/// use pulse_tick::{GroupId, UpdateGroup};
///
/// struct Simulation;
///
/// impl UpdateGroup for Simulation {
///     fn group_name() -> &'static str {
///         "Simulation"
///     }
/// }
///
/// assert_eq!(Simulation::group_id(), GroupId::from_name("Simulation"));
/// ```
pub trait UpdateGroup: 'static {
    /// A human-readable name for this group.
    fn group_name() -> &'static str;

    /// Returns the [`GroupId`] for this marker.
    fn group_id() -> GroupId {
        GroupId::from_name(Self::group_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Simulation;

    impl UpdateGroup for Simulation {
        fn group_name() -> &'static str {
            "Simulation"
        }
    }

    #[test]
    fn test_group_id_is_stable() {
        let id1 = Simulation::group_id();
        let id2 = Simulation::group_id();
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_group_id_matches_from_name() {
        // The trait method and the standalone function must produce the same id.
        assert_eq!(Simulation::group_id(), GroupId::from_name("Simulation"));
        assert_eq!(GroupId::of::<Simulation>(), Simulation::group_id());
    }

    #[test]
    fn test_group_id_differs_between_names() {
        assert_ne!(
            GroupId::from_name("Simulation"),
            GroupId::from_name("Presentation")
        );
    }

    #[test]
    fn test_fnv1a_known_vector() {
        // FNV-1a 64-bit of the empty string is the offset basis itself.
        assert_eq!(GroupId::from_name(""), GroupId(0xcbf2_9ce4_8422_2325));
    }
}
