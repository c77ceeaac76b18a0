//! Sorted, task-indexed collections of ranges produced by a partitioner.

use crate::error::{CoreError, Result};
use crate::space::{Range, Space};
use std::fmt;

/// A `(task, range, mapNo)` triple. `map_no` disambiguates multiple disjoint
/// sub-ranges assigned to the same task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskRange {
    pub task: usize,
    pub range: Range,
    pub map_no: i32,
}

/// A partitioning of a `Space` across a task group: a sorted list of
/// `TaskRange` entries plus an offset table into contiguous per-task
/// segments.
///
/// Invariants (see crate docs): sorted by `(task, mapNo, from)`; `off` is
/// monotone with `off.len() == group_size + 1`; entries sharing a
/// `(task, mapNo)` are disjoint. A task owning nothing is legal -- its
/// segment in `off` is simply empty.
#[derive(Clone, Debug)]
pub struct RangeList {
    entries: Vec<TaskRange>,
    off: Vec<usize>,
}

impl RangeList {
    #[must_use]
    pub fn entries(&self) -> &[TaskRange] {
        &self.entries
    }

    /// The contiguous slice of entries owned by `task`.
    #[must_use]
    pub fn task_entries(&self, task: usize) -> &[TaskRange] {
        &self.entries[self.off[task]..self.off[task + 1]]
    }

    #[must_use]
    pub fn group_size(&self) -> usize {
        self.off.len() - 1
    }

    /// Total number of index positions covered across every entry (counting
    /// indices owned by more than one task once per owner, as in `All`).
    #[must_use]
    pub fn total_coverage(&self, dims: usize) -> u64 {
        self.entries.iter().map(|e| e.range.size(dims)).sum()
    }

}

impl fmt::Display for RangeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RangeList({} entries, {} tasks)", self.entries.len(), self.group_size())?;
        for e in &self.entries {
            writeln!(f, "  task {} map {}: {}", e.task, e.map_no, e.range)?;
        }
        Ok(())
    }
}

/// Accumulates `(task, range)` appends from a partitioner run and finishes
/// them into a well-formed [`RangeList`].
///
/// By default each appended range gets its own sequential `mapNo` per task.
/// A builder constructed with [`RangeListBuilder::consolidating`] instead
/// deduplicates adjacent identical `(task, range)` pairs after sorting --
/// used by partitioners (such as a predecessor-fan-in partitioner) that may
/// legitimately emit the same range more than once for a task.
pub struct RangeListBuilder {
    group_size: usize,
    space: Space,
    consolidate: bool,
    raw: Vec<(usize, Range)>,
}

impl RangeListBuilder {
    #[must_use]
    pub fn new(group_size: usize, space: Space) -> Self {
        Self {
            group_size,
            space,
            consolidate: false,
            raw: Vec::new(),
        }
    }

    /// Enable adjacent-duplicate consolidation for this build.
    #[must_use]
    pub fn consolidating(mut self) -> Self {
        self.consolidate = true;
        self
    }

    /// Append a range for `task`. Fails fatally (precondition violation) if
    /// the range lies outside the governing space.
    pub fn append(&mut self, task: usize, range: Range) -> Result<()> {
        assert!(task < self.group_size, "task id out of bounds for group");
        let dims = self.space.dims();
        if range.is_empty(dims) {
            return Ok(());
        }
        let size = self.space.size();
        for d in 0..dims {
            if range.from.i[d] < 0 || range.to.i[d] > size[d] {
                return Err(CoreError::OutOfSpace {
                    index: range.to,
                    dims,
                    extents: size,
                });
            }
        }
        self.raw.push((task, range));
        Ok(())
    }

    /// Sort, optionally consolidate, assign `mapNo`s, and build the offset
    /// table.
    ///
    /// # Errors
    /// Returns [`CoreError::DuplicateMapNo`] if a non-consolidating builder
    /// ends up with the exact same `(task, range)` appended more than once --
    /// a partitioner that legitimately needs to do this must build with
    /// [`RangeListBuilder::consolidating`] instead.
    pub fn finish(mut self) -> Result<RangeList> {
        self.raw
            .sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.from.i[0].cmp(&b.1.from.i[0])));

        if self.consolidate {
            self.raw.dedup_by(|a, b| a.0 == b.0 && a.1 == b.1);
        }

        let mut entries = Vec::with_capacity(self.raw.len());
        let mut off = vec![0usize; self.group_size + 1];
        let mut map_no = 0i32;
        let mut prev: Option<(usize, Range)> = None;

        for (task, range) in self.raw {
            if Some(task) != prev.map(|(t, _)| t) {
                map_no = 0;
            } else if !self.consolidate && prev == Some((task, range)) {
                return Err(CoreError::DuplicateMapNo { task, map_no });
            }
            entries.push(TaskRange {
                task,
                range,
                map_no,
            });
            map_no += 1;
            prev = Some((task, range));
        }

        let mut cursor = 0usize;
        for t in 0..self.group_size {
            off[t] = cursor;
            while cursor < entries.len() && entries[cursor].task == t {
                cursor += 1;
            }
        }
        off[self.group_size] = entries.len();

        Ok(RangeList { entries, off })
    }
}
