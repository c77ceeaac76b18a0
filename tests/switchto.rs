//! End-to-end `Data::switchto` scenarios across simulated task groups.

use std::sync::Arc;
use taskspace::backend::{SingleProcessBackend, ThreadBackend};
use taskspace::data::Data;
use taskspace::group::Group;
use taskspace::partitioner::{All, Block};
use taskspace::space::Space;
use taskspace::transition::TransitionFlags;

#[test]
fn single_task_switch_between_partitioners_preserves_values() {
    let space = Space::new_1d(50);
    let group = Group::new(1, 0);
    let backend = Box::new(SingleProcessBackend::<i64>::new());
    let mut data = Data::new(space, group, &All, backend, 0_i64).unwrap();

    for (off, v) in data.map_def1_mut().0.iter_mut().enumerate() {
        *v = off as i64;
    }

    let flags = TransitionFlags {
        copy_in: true,
        copy_out: true,
        ..Default::default()
    };
    data.switchto(&Block::new(0), flags).unwrap();

    let (buf, _) = data.map_def1();
    assert_eq!(buf.len(), 50);
    assert_eq!(buf[0], 0);
    assert_eq!(buf[49], 49);
}

#[test]
fn two_task_redistribution_moves_values_to_their_new_owner() {
    let space = Space::new_1d(40);
    let backends = ThreadBackend::<f64>::make_group(2);

    let flags = TransitionFlags {
        copy_in: true,
        copy_out: true,
        ..Default::default()
    };

    let results = std::thread::scope(|scope| {
        let handles: Vec<_> = backends
            .into_iter()
            .enumerate()
            .map(|(i, backend)| {
                let space = space.clone();
                scope.spawn(move || {
                    let group = Group::new(2, i);
                    let mut data =
                        Data::new(space, group, &Block::new(0), Box::new(backend), -1.0_f64)
                            .unwrap();
                    for v in data.map_def1_mut().0.iter_mut() {
                        *v = i as f64;
                    }
                    // Skew task 0 to own 3x task 1's share: the split point
                    // moves from 20 to 30, so task 0 picks up [20,30) from
                    // task 1 and task 1 is left with [30,40).
                    let skewed = Block::new(0).with_task_weight(Arc::new(|t: usize| {
                        if t == 0 {
                            3.0
                        } else {
                            1.0
                        }
                    }));
                    data.switchto(&skewed, flags).unwrap();
                    data.map_def1().0.to_vec()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
    });

    assert_eq!(results[0].len(), 30);
    assert_eq!(results[1].len(), 10);
    assert!(results[0][..20].iter().all(|&v| v == 0.0));
    assert!(results[0][20..].iter().all(|&v| v == 1.0));
    assert!(results[1].iter().all(|&v| v == 1.0));
}

#[test]
fn three_task_block_rebalance_carries_values_across_two_peers() {
    let space = Space::new_1d(30);
    let backends = ThreadBackend::<i32>::make_group(3);

    let flags = TransitionFlags {
        copy_in: true,
        copy_out: true,
        ..Default::default()
    };

    let results = std::thread::scope(|scope| {
        let handles: Vec<_> = backends
            .into_iter()
            .enumerate()
            .map(|(i, backend)| {
                let space = space.clone();
                scope.spawn(move || {
                    let group = Group::new(3, i);
                    // Start with everything on task 0.
                    let mut data =
                        Data::new(space, group, &taskspace::partitioner::Master, Box::new(backend), 0)
                            .unwrap();
                    if i == 0 {
                        for (off, v) in data.map_def1_mut().0.iter_mut().enumerate() {
                            *v = off as i32;
                        }
                    }
                    data.switchto(&Block::new(0), flags).unwrap();
                    data.map_def1().0.to_vec()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
    });

    let mut rebuilt = vec![0; 30];
    let mut cursor = 0usize;
    for share in &results {
        rebuilt[cursor..cursor + share.len()].copy_from_slice(share);
        cursor += share.len();
    }
    assert_eq!(rebuilt, (0..30).collect::<Vec<_>>());
}
