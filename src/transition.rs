//! The transition planner: computes, for one task, what must happen locally
//! and over the wire to move a container from one partitioning to another.

use crate::error::{CoreError, Result};
use crate::rangelist::RangeList;
use crate::space::Range;
use std::fmt;

/// Which data-flow obligations a `switchto` must honor.
///
/// `reduce_out` is reserved (the wire format and accumulation semantics for
/// a reducing transition are not part of this core) and always rejected by
/// [`TransitionPlan::build`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransitionFlags {
    /// Preserve values already held under the old partitioning into the new
    /// one, for the overlap between old and new ownership.
    pub copy_in: bool,
    /// Ship values this task is giving up to whichever task picks them up.
    /// Typically set together with `copy_in` so both sides agree.
    pub copy_out: bool,
    /// Newly-owned indices with no old-owner overlap (or with `copy_in`
    /// unset entirely) must be left for the caller to initialize.
    pub init: bool,
    /// Not implemented; `build` rejects any flag set with this set.
    pub reduce_out: bool,
}

/// A contiguous sub-range to pull from `from_task`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecvAction {
    pub range: Range,
    pub from_task: usize,
}

/// A contiguous sub-range to push to `to_task`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SendAction {
    pub range: Range,
    pub to_task: usize,
}

/// The local execution plan for one task's share of a collective `switchto`.
///
/// Built identically (modulo `my_task`) by every task in the group from the
/// same `(old, new)` `RangeList` pair, so every `send`/`recv` pairing agrees
/// on both ends without further negotiation.
#[derive(Clone, Debug, Default)]
pub struct TransitionPlan {
    pub flags: TransitionFlags,
    /// Ranges this task owned before and owns after: no transport, values
    /// may still need repacking between old and new layouts locally.
    pub keep: Vec<Range>,
    /// Ranges to receive from a specific peer.
    pub recv: Vec<RecvAction>,
    /// Ranges to send to a specific peer.
    pub send: Vec<SendAction>,
    /// Newly-owned ranges with no source anywhere (or `copy_in` disabled):
    /// the caller must supply a value, per `flags.init`.
    pub init_only: Vec<Range>,
}

impl TransitionPlan {
    /// # Errors
    /// Returns [`CoreError::UnsupportedFlags`] if `flags.reduce_out` is set.
    pub fn build(
        my_task: usize,
        old: &RangeList,
        new: &RangeList,
        flags: TransitionFlags,
    ) -> Result<Self> {
        if flags.reduce_out {
            return Err(CoreError::UnsupportedFlags {
                reason: "ReduceOut transitions are not implemented".to_string(),
            });
        }

        let mut plan = Self {
            flags,
            ..Self::default()
        };

        let my_new: Vec<Range> = new.task_entries(my_task).iter().map(|e| e.range).collect();
        let my_old: Vec<Range> = old.task_entries(my_task).iter().map(|e| e.range).collect();

        for &new_range in &my_new {
            let mut covered = Vec::new();
            if flags.copy_in {
                for entry in old.entries() {
                    if let Some(overlap) = new_range.intersect_1d(&entry.range) {
                        covered.push(overlap);
                        if entry.task == my_task {
                            plan.keep.push(overlap);
                        } else {
                            plan.recv.push(RecvAction {
                                range: overlap,
                                from_task: entry.task,
                            });
                        }
                    }
                }
            }
            plan.init_only.extend(gaps(new_range, &covered));
        }

        if flags.copy_out {
            for &old_range in &my_old {
                for entry in new.entries() {
                    if entry.task == my_task {
                        continue;
                    }
                    if let Some(overlap) = old_range.intersect_1d(&entry.range) {
                        plan.send.push(SendAction {
                            range: overlap,
                            to_task: entry.task,
                        });
                    }
                }
            }
        }

        Ok(plan)
    }

    /// Whether this task participates in the transition at all (owns
    /// something before, after, or both).
    #[must_use]
    pub fn is_trivial(&self) -> bool {
        self.keep.is_empty()
            && self.recv.is_empty()
            && self.send.is_empty()
            && self.init_only.is_empty()
    }
}

/// The complement of `range` not covered by any of `covered` (assumed each
/// to lie within `range`, as they come from intersecting with it).
fn gaps(range: Range, covered: &[Range]) -> Vec<Range> {
    let mut sorted = covered.to_vec();
    sorted.sort_by_key(|r| r.from.i[0]);
    let mut out = Vec::new();
    let mut cursor = range.from.i[0];
    for r in &sorted {
        if r.from.i[0] > cursor {
            out.push(Range::new_1d(cursor, r.from.i[0]));
        }
        cursor = cursor.max(r.to.i[0]);
    }
    if cursor < range.to.i[0] {
        out.push(Range::new_1d(cursor, range.to.i[0]));
    }
    out
}

impl fmt::Display for TransitionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TransitionPlan({:?})", self.flags)?;
        for r in &self.keep {
            writeln!(f, "  keep {r}")?;
        }
        for a in &self.recv {
            writeln!(f, "  recv {} from task {}", a.range, a.from_task)?;
        }
        for a in &self.send {
            writeln!(f, "  send {} to task {}", a.range, a.to_task)?;
        }
        for r in &self.init_only {
            writeln!(f, "  init {r}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Group;
    use crate::rangelist::RangeListBuilder;
    use crate::space::Space;

    fn rl(space: &Space, entries: &[(usize, i64, i64)]) -> RangeList {
        let mut b = RangeListBuilder::new(
            entries.iter().map(|e| e.0 + 1).max().unwrap_or(1),
            space.clone(),
        );
        for &(t, from, to) in entries {
            b.append(t, Range::new_1d(from, to)).unwrap();
        }
        b.finish().unwrap()
    }

    #[test]
    fn pure_shrink_keeps_overlap_and_frees_rest() {
        let space = Space::new_1d(100);
        let old = rl(&space, &[(0, 0, 50), (1, 50, 100)]);
        let new = rl(&space, &[(0, 0, 25), (1, 25, 100)]);
        let flags = TransitionFlags {
            copy_in: true,
            copy_out: true,
            ..Default::default()
        };
        let plan0 = TransitionPlan::build(0, &old, &new, flags).unwrap();
        assert_eq!(plan0.keep, vec![Range::new_1d(0, 25)]);
        assert_eq!(plan0.send.len(), 1);
        assert_eq!(plan0.send[0].to_task, 1);
        assert_eq!(plan0.send[0].range, Range::new_1d(25, 50));

        let plan1 = TransitionPlan::build(1, &old, &new, flags).unwrap();
        assert_eq!(plan1.recv.len(), 1);
        assert_eq!(plan1.recv[0].from_task, 0);
        assert_eq!(plan1.recv[0].range, Range::new_1d(25, 50));
        assert_eq!(plan1.keep, vec![Range::new_1d(50, 100)]);
    }

    #[test]
    fn growth_without_copy_in_is_all_init() {
        let space = Space::new_1d(100);
        let old = rl(&space, &[(0, 0, 50)]);
        let new = rl(&space, &[(0, 0, 100)]);
        let flags = TransitionFlags::default();
        let plan = TransitionPlan::build(0, &old, &new, flags).unwrap();
        assert!(plan.keep.is_empty());
        assert_eq!(plan.init_only, vec![Range::new_1d(0, 100)]);
    }

    #[test]
    fn growth_with_copy_in_keeps_old_and_inits_new_tail() {
        let space = Space::new_1d(100);
        let old = rl(&space, &[(0, 0, 50)]);
        let new = rl(&space, &[(0, 0, 100)]);
        let flags = TransitionFlags {
            copy_in: true,
            ..Default::default()
        };
        let plan = TransitionPlan::build(0, &old, &new, flags).unwrap();
        assert_eq!(plan.keep, vec![Range::new_1d(0, 50)]);
        assert_eq!(plan.init_only, vec![Range::new_1d(50, 100)]);
    }

    #[test]
    fn reduce_out_is_rejected() {
        let space = Space::new_1d(10);
        let old = rl(&space, &[(0, 0, 10)]);
        let new = rl(&space, &[(0, 0, 10)]);
        let flags = TransitionFlags {
            reduce_out: true,
            ..Default::default()
        };
        assert!(TransitionPlan::build(0, &old, &new, flags).is_err());
    }
}
