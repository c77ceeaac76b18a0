//! Task-group membership.
//!
//! A `Group` is the minimal stand-in for "process-group membership
//! discovery", which spec treats as an external collaborator. This core
//! only needs a stable size and a local task id; a real deployment wires
//! these up from its backend's `world`/`my_id`/`size` calls (see
//! [`crate::backend`]).

/// A fixed-size set of cooperating tasks and the local task's id within it.
///
/// Peer set is assumed stable across a transition (no fault recovery of
/// lost peers, per the core's non-goals).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Group {
    size: usize,
    my_id: usize,
}

impl Group {
    /// # Panics
    /// Panics if `size == 0` or `my_id >= size`.
    #[must_use]
    pub fn new(size: usize, my_id: usize) -> Self {
        assert!(size > 0, "group must have at least one task");
        assert!(my_id < size, "my_id must be within the group");
        Self { size, my_id }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn my_id(&self) -> usize {
        self.my_id
    }
}
