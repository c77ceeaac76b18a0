//! Shared Markov-chain graph construction, predecessor-fan-in read
//! partitioner, and the read/write alternating run loop. Factored out of
//! `markov.rs` so the demo binary and its integration test build the exact
//! same graph and drive the exact same iteration loop.

use std::sync::Arc;
use taskspace::data::Data;
use taskspace::group::Group;
use taskspace::partitioner::{Custom, Partitioner};
use taskspace::rangelist::{RangeList, RangeListBuilder};
use taskspace::space::{Index, Range, Space};
use taskspace::transition::TransitionFlags;

/// `n` states, each fed by `fan_in` ring-stepped predecessors plus a
/// self-stay term of weight `5.0`. Every row's weights are normalized per
/// *source* column, so each state's total outgoing probability mass (over
/// every destination it feeds, plus its own self-stay) sums to `1.0` --
/// this is what keeps the overall distribution's mass conserved across
/// iterations.
pub struct MarkovGraph {
    pub n: i64,
    pub fan_in: usize,
    cm: Vec<i64>,
    pm: Vec<f64>,
}

impl MarkovGraph {
    #[must_use]
    pub fn new(n: i64, fan_in: usize) -> Self {
        let cols = fan_in + 1;
        let mut cm = vec![0i64; n as usize * cols];
        let mut pm = vec![0.0f64; n as usize * cols];
        let mut sum = vec![0.0f64; n as usize];

        for i in 0..n {
            let row = i as usize * cols;
            let mut step: i64 = 1;
            cm[row] = i;
            pm[row] = 5.0;
            sum[i as usize] += 5.0;
            for j in 1..=fan_in as i64 {
                let from_node = (i + step).rem_euclid(n);
                let prob = ((j + i) % (5 * fan_in as i64) + 1) as f64;
                sum[from_node as usize] += prob;
                cm[row + j as usize] = from_node;
                pm[row + j as usize] = prob;
                step = 2 * step + j;
                while step > n {
                    step -= n;
                }
            }
        }

        for i in 0..n {
            let row = i as usize * cols;
            for j in 0..cols {
                pm[row + j] /= sum[cm[row + j] as usize];
            }
        }

        Self { n, fan_in, cm, pm }
    }

    fn cols(&self) -> usize {
        self.fan_in + 1
    }

    /// `(predecessor_state, transition_probability)` for every incoming
    /// edge of `state`, column `0` always the self-stay term `(state, _)`.
    pub fn predecessors(&self, state: i64) -> impl Iterator<Item = (i64, f64)> + '_ {
        let row = state as usize * self.cols();
        (0..self.cols()).map(move |j| (self.cm[row + j], self.pm[row + j]))
    }
}

/// For every state a task owns under `write`, appends a single-index range
/// for each of that state's predecessors (including itself) to the same
/// task. The same predecessor commonly feeds more than one locally-owned
/// state, so this must run against a consolidating builder.
pub fn read_partitioner(
    graph: Arc<MarkovGraph>,
) -> Custom<impl Fn(&Group, &Space, Option<&RangeList>, &mut RangeListBuilder) -> taskspace::Result<()>> {
    Custom::new("markov-read", move |_group, _space, other, builder| {
        let write = other.expect("read partitioner requires the write partitioning as `other`");
        for entry in write.entries() {
            for state in entry.range.from.i[0]..entry.range.to.i[0] {
                for (pred, _) in graph.predecessors(state) {
                    builder.append(entry.task, Range::new_1d(pred, pred + 1))?;
                }
            }
        }
        Ok(())
    })
    .consolidating()
}

/// Zeroes every locally-owned slot of `data`, then sets global state `0` to
/// probability `1.0` if this task owns it.
pub fn seed_state_zero(data: &mut Data<f64>) {
    for n in 0..data.map_count() {
        let (buf, _) = data.map_def_mut(n).expect("map_count bounds map_def");
        buf.fill(0.0);
    }
    if let Some(slot) = data.get_mut(&Index::of(0)) {
        *slot = 1.0;
    }
}

/// Runs `miter` read/write iterations, alternating by index parity which of
/// `data1`/`data2` is read from and which is written to each step (the
/// original swaps the role of two containers in place every pass; this
/// recomputes the role from `iter % 2` instead, which sidesteps holding two
/// simultaneous mutable aliases of the same binding across loop bodies).
/// Returns `true` if `data2` ends up holding the final distribution,
/// `false` if `data1` does.
///
/// # Errors
/// Propagates any error from either container's `switchto`.
pub fn run_markov(
    graph: &MarkovGraph,
    miter: usize,
    data1: &mut Data<f64>,
    data2: &mut Data<f64>,
    write: &dyn Partitioner,
    read: &dyn Partitioner,
) -> taskspace::Result<bool> {
    let read_flags = TransitionFlags {
        copy_in: true,
        ..Default::default()
    };
    let write_flags = TransitionFlags {
        copy_out: true,
        ..Default::default()
    };

    for iter in 0..miter {
        let (read_data, write_data) = if iter % 2 == 0 {
            (&mut *data1, &mut *data2)
        } else {
            (&mut *data2, &mut *data1)
        };

        read_data.switchto(read, read_flags)?;
        write_data.switchto(write, write_flags)?;

        for n in 0..write_data.map_count() {
            let (buf, layout) = write_data.map_def(n).expect("map_count bounds map_def");
            let mut updated = buf.to_vec();
            for (off, slot) in updated.iter_mut().enumerate() {
                let state = layout
                    .to_global(off as u64)
                    .expect("local offset always resolves to a global index")
                    .i[0];
                let mut v = 0.0;
                for (pred, prob) in graph.predecessors(state) {
                    v += read_data.get(&Index::of(pred)).expect(
                        "every predecessor of a locally-owned state is locally resident after the read switch",
                    ) * prob;
                }
                *slot = v;
            }
            write_data
                .map_def_mut(n)
                .expect("map_count bounds map_def")
                .0
                .copy_from_slice(&updated);
        }
    }

    Ok(miter % 2 == 1)
}
