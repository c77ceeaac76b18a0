//! Distributed Markov-chain stationary-distribution demo.
//!
//! Builds a ring-structured predecessor graph, then alternates two
//! containers each iteration: one switched to a halo partitioning exposing
//! every predecessor of a task's owned states (read role), the other
//! switched to a dense per-task block (write role). Each iteration computes
//! every locally-owned state's next-step probability as a weighted sum over
//! its predecessors, then swaps which container plays which role.

#[path = "markov_graph.rs"]
mod markov_graph;

use markov_graph::{read_partitioner, run_markov, seed_state_zero, MarkovGraph};
use std::sync::Arc;
use taskspace::backend::ThreadBackend;
use taskspace::data::Data;
use taskspace::group::Group;
use taskspace::partitioner::{Block, Master};
use taskspace::space::Space;
use taskspace::transition::TransitionFlags;
use tracing::info;

const NUM_STATES: i64 = 2_000;
const FAN_IN: usize = 10;
const NUM_TASKS: usize = 4;
const MITER: usize = 10;

fn run_task(
    my_id: usize,
    graph: Arc<MarkovGraph>,
    backend1: ThreadBackend<f64>,
    backend2: ThreadBackend<f64>,
) -> Option<Vec<f64>> {
    let space = Space::new_1d(graph.n);
    let group = Group::new(NUM_TASKS, my_id);
    let write = Block::new(0);
    let read = read_partitioner(Arc::clone(&graph));

    let mut data1 = Data::new(space.clone(), group, &write, Box::new(backend1), 0.0_f64)
        .expect("block partitioning is always constructible");
    let mut data2 = Data::new(space, group, &write, Box::new(backend2), 0.0_f64)
        .expect("block partitioning is always constructible");

    seed_state_zero(&mut data1);

    let final_is_data2 = run_markov(&graph, MITER, &mut data1, &mut data2, &write, &read)
        .expect("a well-formed read/write partitioner pair never fails to switch");
    let result = if final_is_data2 { &mut data2 } else { &mut data1 };

    result
        .switchto(
            &Master,
            TransitionFlags {
                copy_in: true,
                ..Default::default()
            },
        )
        .expect("gathering to task 0 never fails");

    info!(task = my_id, "markov run complete");

    (my_id == 0).then(|| result.map_def1().0.to_vec())
}

fn main() {
    tracing_subscriber::fmt::init();

    let graph = Arc::new(MarkovGraph::new(NUM_STATES, FAN_IN));
    let backends1 = ThreadBackend::<f64>::make_group(NUM_TASKS);
    let backends2 = ThreadBackend::<f64>::make_group(NUM_TASKS);

    let results: Vec<Option<Vec<f64>>> = std::thread::scope(|scope| {
        let handles: Vec<_> = backends1
            .into_iter()
            .zip(backends2)
            .enumerate()
            .map(|(i, (b1, b2))| {
                let graph = Arc::clone(&graph);
                scope.spawn(move || run_task(i, graph, b1, b2))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let final_probs = results
        .into_iter()
        .flatten()
        .next()
        .expect("task 0 always gathers the final distribution");
    let sum: f64 = final_probs.iter().sum();

    println!("markov chain: {NUM_STATES} states, fan-in {FAN_IN}, {MITER} iterations, {NUM_TASKS} tasks");
    println!(
        "  p0 = {:.6}, p1 = {:.6}, p2 = {:.6}, sum = {:.6}",
        final_probs[0], final_probs[1], final_probs[2], sum
    );
}
