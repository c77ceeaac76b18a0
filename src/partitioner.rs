//! Partitioners: pure functions from `(group, space, optional other RangeList)`
//! to a [`RangeList`].
//!
//! A partitioner is "pure": two evaluations with identical inputs produce
//! `RangeList`s comparing equal up to sorting. User data captured by a
//! `Custom` partitioner is read but never mutated during a run -- this core
//! captures it by value in a closure (see the design note in crate docs
//! about avoiding raw user-data pointers).

use crate::error::Result;
use crate::group::Group;
use crate::rangelist::{RangeList, RangeListBuilder};
use crate::space::{Index, Space};
use std::sync::Arc;

/// A pure function from `(group, space, other)` to entries appended into
/// `builder`. Implementors must not mutate anything outside `builder`.
pub trait Partitioner: Send + Sync {
    /// Human-readable name, surfaced in `Display`/`describe` output and logs.
    fn name(&self) -> &str;

    /// Run this partitioner, appending entries to `builder`.
    fn run(
        &self,
        group: &Group,
        space: &Space,
        other: Option<&RangeList>,
        builder: &mut RangeListBuilder,
    ) -> Result<()>;

    /// Whether `Partitioning::compute` should build its
    /// [`RangeListBuilder`] in [`RangeListBuilder::consolidating`] mode for
    /// this partitioner. Most partitioners emit each `(task, range)` exactly
    /// once and leave this `false`; a partitioner that legitimately revisits
    /// the same pair (e.g. two locally-owned states sharing a predecessor)
    /// overrides it.
    fn wants_consolidation(&self) -> bool {
        false
    }
}

/// Every task gets the full space.
pub struct All;

impl Partitioner for All {
    fn name(&self) -> &str {
        "all"
    }

    fn run(
        &self,
        group: &Group,
        space: &Space,
        _other: Option<&RangeList>,
        builder: &mut RangeListBuilder,
    ) -> Result<()> {
        let full = space.full_range();
        for task in 0..group.size() {
            builder.append(task, full)?;
        }
        Ok(())
    }
}

/// Only task 0 gets the full space.
pub struct Master;

impl Partitioner for Master {
    fn name(&self) -> &str {
        "master"
    }

    fn run(
        &self,
        _group: &Group,
        space: &Space,
        _other: Option<&RangeList>,
        builder: &mut RangeListBuilder,
    ) -> Result<()> {
        builder.append(0, space.full_range())
    }
}

/// For each entry in `base`, emits a full-space range restricted in
/// dimension `to_dim` to `base`'s extent in dimension `from_dim`.
///
/// Preconditions (fatal if violated by caller misuse): `from_dim`/`to_dim`
/// must be valid dimension indices for `base`'s space / the target space
/// respectively.
pub struct Copy {
    base: Arc<RangeList>,
    from_dim: usize,
    to_dim: usize,
}

impl Copy {
    #[must_use]
    pub fn new(base: Arc<RangeList>, from_dim: usize, to_dim: usize) -> Self {
        Self {
            base,
            from_dim,
            to_dim,
        }
    }
}

impl Partitioner for Copy {
    fn name(&self) -> &str {
        "copy"
    }

    fn run(
        &self,
        _group: &Group,
        space: &Space,
        _other: Option<&RangeList>,
        builder: &mut RangeListBuilder,
    ) -> Result<()> {
        assert!(self.from_dim < 3 && self.to_dim < space.dims(), "dimension index out of range");
        for entry in self.base.entries() {
            let mut range = space.full_range();
            range.from.i[self.to_dim] = entry.range.from.i[self.from_dim];
            range.to.i[self.to_dim] = entry.range.to.i[self.from_dim];
            builder.append(entry.task, range)?;
        }
        Ok(())
    }
}

/// Per-index weight function for [`Block`].
pub type IndexWeightFn = Arc<dyn Fn(&Index) -> f64 + Send + Sync>;
/// Per-task weight function for [`Block`].
pub type TaskWeightFn = Arc<dyn Fn(usize) -> f64 + Send + Sync>;

/// Splits dimension `pdim` into contiguous blocks whose per-index weight
/// sums are approximately proportional to each task's weight, optionally
/// repeating the round-robin assignment over `cycles` rounds.
pub struct Block {
    pdim: usize,
    cycles: u32,
    idx_weight: Option<IndexWeightFn>,
    task_weight: Option<TaskWeightFn>,
}

impl Block {
    #[must_use]
    pub fn new(pdim: usize) -> Self {
        Self {
            pdim,
            cycles: 1,
            idx_weight: None,
            task_weight: None,
        }
    }

    #[must_use]
    pub fn with_cycles(mut self, cycles: u32) -> Self {
        self.cycles = cycles.clamp(1, 10);
        self
    }

    #[must_use]
    pub fn with_index_weight(mut self, f: IndexWeightFn) -> Self {
        self.idx_weight = Some(f);
        self
    }

    #[must_use]
    pub fn with_task_weight(mut self, f: TaskWeightFn) -> Self {
        self.task_weight = Some(f);
        self
    }
}

impl Partitioner for Block {
    fn name(&self) -> &str {
        "block"
    }

    fn run(
        &self,
        group: &Group,
        space: &Space,
        _other: Option<&RangeList>,
        builder: &mut RangeListBuilder,
    ) -> Result<()> {
        use crate::error::CoreError;

        let count = group.size();
        let size = space.extent(self.pdim) as u64;
        let cycles = u64::from(self.cycles);

        let total_w: f64 = if let Some(f) = &self.idx_weight {
            let mut idx = Index::default();
            let mut sum = 0.0;
            for i in 0..size {
                idx.i[self.pdim] = i as i64;
                let w = f(&idx);
                if !w.is_finite() {
                    return Err(CoreError::NonFinitePartitionWeight);
                }
                sum += w;
            }
            sum
        } else {
            size as f64
        };

        let total_tw: f64 = if let Some(f) = &self.task_weight {
            let mut sum = 0.0;
            for t in 0..count {
                let w = f(t);
                if !w.is_finite() {
                    return Err(CoreError::NonFinitePartitionWeight);
                }
                sum += w;
            }
            sum
        } else {
            count as f64
        };

        let per_part = total_w / (count as f64) / (cycles as f64);
        let task_w_of = |t: usize| -> f64 {
            self.task_weight
                .as_ref()
                .map_or(1.0, |f| f(t) * (count as f64) / total_tw)
        };

        let mut w = -0.5f64;
        let mut task = 0usize;
        let mut cycle = 0u64;
        let mut task_w = task_w_of(task);
        let mut from = 0i64;

        let mut idx = Index::default();
        for i in 0..size {
            if let Some(f) = &self.idx_weight {
                idx.i[self.pdim] = i as i64;
                w += f(&idx);
            } else {
                w += 1.0;
            }

            while w >= per_part * task_w {
                w -= per_part * task_w;
                if task + 1 == count && cycle + 1 == cycles {
                    break;
                }
                let to = i as i64;
                if from < to {
                    let mut range = space.full_range();
                    range.from.i[self.pdim] = from;
                    range.to.i[self.pdim] = to;
                    builder.append(task, range)?;
                }
                task += 1;
                if task == count {
                    task = 0;
                    cycle += 1;
                }
                task_w = task_w_of(task);
                from = i as i64;
            }
            if task + 1 == count && cycle + 1 == cycles {
                break;
            }
        }

        let mut range = space.full_range();
        range.from.i[self.pdim] = from;
        range.to.i[self.pdim] = size as i64;
        builder.append(task, range)?;

        Ok(())
    }
}

/// A user-supplied partitioner. May consume `other` (the prior partitioning's
/// `RangeList`) to derive a halo-aware partitioning, e.g. appending every
/// predecessor of each locally-owned state under a graph adjacency.
///
/// The closure captures any data it needs by value (or via `Arc`), matching
/// the "capture by value" design guidance over raw user-data pointers.
pub struct Custom<F>
where
    F: Fn(&Group, &Space, Option<&RangeList>, &mut RangeListBuilder) -> Result<()> + Send + Sync,
{
    name: String,
    f: F,
    consolidating: bool,
}

impl<F> Custom<F>
where
    F: Fn(&Group, &Space, Option<&RangeList>, &mut RangeListBuilder) -> Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            consolidating: false,
        }
    }

    /// Marks this partitioner as one that may legitimately append the same
    /// `(task, range)` pair more than once; `Partitioning::compute` will
    /// then build its `RangeListBuilder` in consolidating mode.
    #[must_use]
    pub fn consolidating(mut self) -> Self {
        self.consolidating = true;
        self
    }
}

impl<F> Partitioner for Custom<F>
where
    F: Fn(&Group, &Space, Option<&RangeList>, &mut RangeListBuilder) -> Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(
        &self,
        group: &Group,
        space: &Space,
        other: Option<&RangeList>,
        builder: &mut RangeListBuilder,
    ) -> Result<()> {
        (self.f)(group, space, other, builder)
    }

    fn wants_consolidation(&self) -> bool {
        self.consolidating
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group3() -> Group {
        Group::new(3, 0)
    }

    #[test]
    fn all_partitioner_covers_space_n_times() {
        let space = Space::new_1d(50);
        let group = group3();
        let mut b = RangeListBuilder::new(group.size(), space.clone());
        All.run(&group, &space, None, &mut b).unwrap();
        let rl = b.finish().unwrap();
        assert_eq!(rl.total_coverage(1), 50 * 3);
        for t in 0..3 {
            assert_eq!(rl.task_entries(t).len(), 1);
        }
    }

    #[test]
    fn master_partitioner_covers_space_once() {
        let space = Space::new_1d(50);
        let group = group3();
        let mut b = RangeListBuilder::new(group.size(), space.clone());
        Master.run(&group, &space, None, &mut b).unwrap();
        let rl = b.finish().unwrap();
        assert_eq!(rl.total_coverage(1), 50);
        assert_eq!(rl.task_entries(0).len(), 1);
        assert!(rl.task_entries(1).is_empty());
    }

    #[test]
    fn block_partitioner_balances_unit_weights() {
        let space = Space::new_1d(100);
        let group = Group::new(4, 0);
        let mut b = RangeListBuilder::new(group.size(), space.clone());
        Block::new(0).run(&group, &space, None, &mut b).unwrap();
        let rl = b.finish().unwrap();
        assert_eq!(rl.total_coverage(1), 100);
        for t in 0..4 {
            let sz: u64 = rl.task_entries(t).iter().map(|e| e.range.size(1)).sum();
            assert!((25..=25).contains(&sz), "expected exactly 25 got {sz}");
        }
    }

    #[test]
    fn block_partitioner_respects_cycles() {
        let space = Space::new_1d(100);
        let group = Group::new(4, 0);
        let mut b = RangeListBuilder::new(group.size(), space.clone());
        Block::new(0).with_cycles(2).run(&group, &space, None, &mut b).unwrap();
        let rl = b.finish().unwrap();
        assert_eq!(rl.total_coverage(1), 100);
        for t in 0..4 {
            assert!(rl.task_entries(t).len() >= 1);
        }
    }
}
