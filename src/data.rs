//! [`Data`]: a typed container bound to a [`Space`]/[`Group`], switchable
//! between partitionings via the [`TransitionPlan`] planner.

use crate::backend::{transition_tag, Backend};
use crate::error::Result;
use crate::group::Group;
use crate::layout::{self, Compact1D, Layout};
use crate::mapping::Mapping;
use crate::partitioner::Partitioner;
use crate::partitioning::Partitioning;
use crate::rangelist::RangeList;
use crate::space::{Index, Range, Space};
use crate::transition::{TransitionFlags, TransitionPlan};
use tracing::debug;

#[cfg(feature = "metrics")]
use crate::metrics::MetricsCollector;

/// A container of `T` distributed over a [`Space`] according to whatever
/// partitioning it currently holds. Every method that moves data is
/// collective: every task in the group must call it with equivalent
/// arguments in the same order.
///
/// A task's local storage is one [`Mapping`] per disjoint range it owns
/// (`mapNo` in the underlying [`RangeList`]); most partitioners hand a task
/// exactly one range, but nothing in this container assumes that.
pub struct Data<T> {
    space: Space,
    group: Group,
    partitioning: Partitioning,
    mappings: Vec<Mapping<T>>,
    backend: Box<dyn Backend<T>>,
    default: T,
    transition_seq: u64,
    #[cfg(feature = "metrics")]
    metrics: MetricsCollector,
}

impl<T: Copy + Send + Sync + 'static> Data<T> {
    /// Allocates a container over `space`/`group`, owned initially according
    /// to `partitioner`. One [`Mapping`] is built per disjoint range
    /// `partitioner` assigns this task; ownership need not be contiguous.
    ///
    /// # Errors
    /// Propagates any error from [`Partitioning::compute`] (an out-of-space
    /// range, a non-finite partition weight, or a malformed builder result).
    pub fn new(
        space: Space,
        group: Group,
        partitioner: &dyn Partitioner,
        backend: Box<dyn Backend<T>>,
        default: T,
    ) -> Result<Self> {
        let partitioning = Partitioning::compute(partitioner, group, space.clone(), None)?;
        let mappings = build_mappings(partitioning.range_list(), group.my_id(), default);
        Ok(Self {
            space,
            group,
            partitioning,
            mappings,
            backend,
            default,
            transition_seq: 0,
            #[cfg(feature = "metrics")]
            metrics: MetricsCollector::default(),
        })
    }

    /// Wraps an already-built mapping and partitioning, for callers that
    /// need a layout this module cannot infer automatically (e.g. a
    /// hand-built [`crate::layout::Sparse1D`]).
    #[must_use]
    pub fn from_parts(
        space: Space,
        group: Group,
        partitioning: Partitioning,
        mapping: Mapping<T>,
        backend: Box<dyn Backend<T>>,
        default: T,
    ) -> Self {
        Self {
            space,
            group,
            partitioning,
            mappings: vec![mapping],
            backend,
            default,
            transition_seq: 0,
            #[cfg(feature = "metrics")]
            metrics: MetricsCollector::default(),
        }
    }

    #[must_use]
    pub fn space(&self) -> &Space {
        &self.space
    }

    #[must_use]
    pub fn group(&self) -> &Group {
        &self.group
    }

    #[must_use]
    pub fn partitioning(&self) -> &Partitioning {
        &self.partitioning
    }

    /// Number of disjoint local mappings this task currently holds.
    #[must_use]
    pub fn map_count(&self) -> usize {
        self.mappings.len()
    }

    /// The default local map (`mapNo` 0): its buffer and layout. For a task
    /// whose ownership is a single contiguous range (the common case) this
    /// is the whole of its local storage.
    #[must_use]
    pub fn map_def1(&self) -> (&[T], &dyn Layout) {
        (self.mappings[0].buf(), self.mappings[0].layout())
    }

    #[must_use]
    pub fn map_def1_mut(&mut self) -> (&mut [T], &dyn Layout) {
        self.mappings[0].split_mut()
    }

    /// The `n`th local map's buffer and layout, or `None` if this task holds
    /// fewer than `n + 1` disjoint ranges.
    #[must_use]
    pub fn map_def(&self, n: usize) -> Option<(&[T], &dyn Layout)> {
        self.mappings.get(n).map(|m| (m.buf(), m.layout()))
    }

    pub fn map_def_mut(&mut self, n: usize) -> Option<(&mut [T], &dyn Layout)> {
        self.mappings.get_mut(n).map(Mapping::split_mut)
    }

    /// Resolve `idx` to a reference into whichever local mapping owns it, or
    /// `None` if this task does not own `idx`. Unambiguous regardless of how
    /// many disjoint mappings this task holds.
    #[must_use]
    pub fn get(&self, idx: &Index) -> Option<&T> {
        self.mappings.iter().find_map(|m| m.get(idx))
    }

    pub fn get_mut(&mut self, idx: &Index) -> Option<&mut T> {
        self.mappings.iter_mut().find_map(|m| m.get_mut(idx))
    }

    /// Global index -> local buffer offset within the first mapping that
    /// resolves it. Ambiguous when this task holds more than one mapping
    /// (the returned offset is only meaningful together with knowledge of
    /// which `map_def(n)` it came from) -- prefer [`Data::get`] in that case.
    #[must_use]
    pub fn global_to_local(&self, idx: &Index) -> Option<u64> {
        self.mappings.iter().find_map(|m| m.global_to_local(idx))
    }

    /// The inverse of `global_to_local`, same ambiguity caveat.
    #[must_use]
    pub fn local_to_global(&self, local_offset: u64) -> Option<Index> {
        self.mappings.iter().find_map(|m| m.local_to_global(local_offset))
    }

    /// Collectively switches to the partitioning produced by `partitioner`,
    /// moving data between tasks as `flags` demands.
    ///
    /// Every `send` is packed and transmitted before any local mapping is
    /// mutated, so an in-place buffer reuse below can never clobber data a
    /// peer still needs. When this task goes from exactly one owned range to
    /// exactly one, the existing allocation is reused in place whenever
    /// [`Layout::reuse`] says it fits; every other shape (a task gaining or
    /// losing ranges, or whose single range moves) rebuilds fresh mappings
    /// and repopulates them via the transition plan's `keep`/`recv` actions.
    ///
    /// # Errors
    /// Returns an error if the new partitioning cannot be computed, the plan
    /// cannot be built (e.g. `flags.reduce_out` is set), or the backend fails
    /// a send/recv.
    pub fn switchto(&mut self, partitioner: &dyn Partitioner, flags: TransitionFlags) -> Result<()> {
        let my_task = self.group.my_id();
        let new_partitioning = Partitioning::compute(
            partitioner,
            self.group,
            self.space.clone(),
            Some(&self.partitioning),
        )?;
        let plan = TransitionPlan::build(
            my_task,
            self.partitioning.range_list(),
            new_partitioning.range_list(),
            flags,
        )?;

        // Every outgoing slice is read out of the *current* mappings before
        // anything below is mutated or reallocated.
        for action in &plan.send {
            let src = mapping_index_for(&self.mappings, &action.range.from)
                .expect("send range must lie within exactly one currently-owned mapping");
            let cap = action.range.size(1) as usize;
            let mut packed = Vec::with_capacity(cap);
            let mut cursor = action.range.from;
            layout::pack_range(
                self.mappings[src].layout(),
                0,
                &action.range,
                self.mappings[src].buf(),
                &mut packed,
                &mut cursor,
                cap,
            )?;
            let tag = transition_tag(self.transition_seq, my_task, action.to_task);
            self.backend.send(action.to_task, tag, &packed)?;
            #[cfg(feature = "metrics")]
            self.metrics.record_send(packed.len() * std::mem::size_of::<T>());
        }

        let new_entries = new_partitioning.range_list().task_entries(my_task).to_vec();
        let reuse_candidate = self.mappings.len() == 1 && new_entries.len() == 1;
        let mut will_reuse = false;
        if reuse_candidate {
            let mut probe = Compact1D::new(new_entries[0].range);
            will_reuse = probe.reuse(
                probe.local_length(),
                self.mappings[0].layout(),
                self.mappings[0].layout().local_length(),
            );
        }

        let mut new_mappings = if will_reuse {
            let mut mapping = self.mappings.remove(0);
            mapping.switch_to(Box::new(Compact1D::new(new_entries[0].range)), self.default)?;
            #[cfg(feature = "metrics")]
            self.metrics.record_mapping_reused();
            vec![mapping]
        } else {
            build_mappings(new_partitioning.range_list(), my_task, self.default)
        };
        let reused_range = will_reuse.then(|| new_entries[0].range);

        for &range in &plan.keep {
            if reused_range == Some(range) {
                continue;
            }
            let src = mapping_index_for(&self.mappings, &range.from)
                .expect("keep range must lie within exactly one currently-owned mapping");
            let dst = mapping_index_for(&new_mappings, &range.from)
                .expect("keep range must lie within exactly one newly-owned mapping");
            let mut cursor = range.from;
            let cap = range.size(1) as usize;
            let src_layout = self.mappings[src].layout();
            let src_buf = self.mappings[src].buf();
            let (dst_buf, dst_layout) = new_mappings[dst].split_mut();
            layout::copy_range(src_layout, 0, src_buf, dst_layout, 0, dst_buf, &range, &mut cursor, cap)?;
        }

        for action in &plan.recv {
            let cap = action.range.size(1) as usize;
            let tag = transition_tag(self.transition_seq, action.from_task, my_task);
            let data = self.backend.recv(action.from_task, tag, cap)?;
            let dst = mapping_index_for(&new_mappings, &action.range.from)
                .expect("recv range must lie within exactly one newly-owned mapping");
            let mut cursor = action.range.from;
            let (dst_buf, dst_layout) = new_mappings[dst].split_mut();
            layout::unpack_range(dst_layout, 0, &action.range, dst_buf, &data, &mut cursor, cap)?;
            #[cfg(feature = "metrics")]
            self.metrics.record_recv(data.len() * std::mem::size_of::<T>());
        }

        debug!(
            transition = self.transition_seq,
            keep = plan.keep.len(),
            send = plan.send.len(),
            recv = plan.recv.len(),
            init = plan.init_only.len(),
            reused = will_reuse,
            "switchto complete"
        );

        self.mappings = new_mappings;
        self.partitioning = new_partitioning;
        self.transition_seq += 1;
        #[cfg(feature = "metrics")]
        self.metrics.record_switch();

        Ok(())
    }

    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }
}

/// Builds one densely-packed [`Mapping`] per disjoint range `range_list`
/// assigns `my_task`. A task owning nothing gets a single zero-length
/// placeholder mapping so `map_def1` always has something to return.
fn build_mappings<T: Copy>(range_list: &RangeList, my_task: usize, default: T) -> Vec<Mapping<T>> {
    let entries = range_list.task_entries(my_task);
    if entries.is_empty() {
        let layout = Compact1D::new(Range::new_1d(0, 0));
        return vec![Mapping::from_buf(Vec::new(), Box::new(layout), 0)];
    }
    entries
        .iter()
        .map(|e| {
            let layout = Compact1D::new(e.range);
            let buf = vec![default; layout.local_length() as usize];
            Mapping::from_buf(buf, Box::new(layout), e.map_no)
        })
        .collect()
}

/// The index of the mapping in `mappings` whose section `0` owns `pt`, or
/// `None` if none does. Every `keep`/`send`/`recv` range the transition
/// planner produces lies entirely within exactly one old entry and exactly
/// one new entry, so using a range's `from` corner as a representative point
/// is always unambiguous.
fn mapping_index_for<T>(mappings: &[Mapping<T>], pt: &Index) -> Option<usize> {
    mappings.iter().position(|m| m.layout().section(pt) == 0)
}
