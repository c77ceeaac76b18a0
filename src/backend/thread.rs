//! In-process multi-thread backend: cooperating tasks run as threads in the
//! same process, talking over `std::sync::mpsc` channels. Intended for
//! tests and single-machine demos; `switchto` callers pair it with
//! `std::thread::scope` so task threads can borrow surrounding state.

use super::Backend;
use crate::error::{CoreError, Result};
use crate::group::Group;
use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{self, Receiver, Sender};

type Msg<T> = (u64, Vec<T>);

pub struct ThreadBackend<T> {
    group: Group,
    senders: Vec<Sender<Msg<T>>>,
    receivers: Vec<Receiver<Msg<T>>>,
    pending: HashMap<usize, VecDeque<Msg<T>>>,
}

impl<T: Send + 'static> ThreadBackend<T> {
    /// Builds one backend endpoint per task in a group of size `n`, fully
    /// connected (every pair gets its own channel).
    #[must_use]
    pub fn make_group(n: usize) -> Vec<ThreadBackend<T>> {
        let mut tx_matrix: Vec<Vec<Option<Sender<Msg<T>>>>> =
            (0..n).map(|_| (0..n).map(|_| None).collect()).collect();
        let mut rx_matrix: Vec<Vec<Option<Receiver<Msg<T>>>>> =
            (0..n).map(|_| (0..n).map(|_| None).collect()).collect();

        for i in 0..n {
            for j in 0..n {
                let (tx, rx) = mpsc::channel();
                tx_matrix[i][j] = Some(tx);
                rx_matrix[i][j] = Some(rx);
            }
        }

        (0..n)
            .map(|i| {
                let senders = (0..n).map(|j| tx_matrix[i][j].take().unwrap()).collect();
                let receivers = (0..n).map(|j| rx_matrix[j][i].take().unwrap()).collect();
                ThreadBackend {
                    group: Group::new(n, i),
                    senders,
                    receivers,
                    pending: HashMap::new(),
                }
            })
            .collect()
    }
}

impl<T: Send + Clone + 'static> Backend<T> for ThreadBackend<T> {
    fn group(&self) -> Group {
        self.group
    }

    fn send(&mut self, to: usize, tag: u64, data: &[T]) -> Result<()> {
        self.senders[to]
            .send((tag, data.to_vec()))
            .map_err(|_| CoreError::BackendTransport {
                message: format!("peer task {to} is gone"),
            })
    }

    fn recv(&mut self, from: usize, tag: u64, len: usize) -> Result<Vec<T>> {
        if let Some(q) = self.pending.get_mut(&from) {
            if let Some(pos) = q.iter().position(|(t, _)| *t == tag) {
                let (_, data) = q.remove(pos).unwrap();
                return check_len(data, len);
            }
        }
        loop {
            let (msg_tag, data) =
                self.receivers[from]
                    .recv()
                    .map_err(|_| CoreError::BackendTransport {
                        message: format!("peer task {from} disconnected before sending"),
                    })?;
            if msg_tag == tag {
                return check_len(data, len);
            }
            self.pending.entry(from).or_default().push_back((msg_tag, data));
        }
    }
}

fn check_len<T>(data: Vec<T>, expected: usize) -> Result<Vec<T>> {
    if data.len() != expected {
        return Err(CoreError::BackendTransport {
            message: format!("expected {expected} elements, received {}", data.len()),
        });
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_between_two_peers() {
        let mut backends = ThreadBackend::<i32>::make_group(2);
        let mut b1 = backends.pop().unwrap();
        let mut b0 = backends.pop().unwrap();
        std::thread::scope(|scope| {
            let h = scope.spawn(move || {
                b0.send(1, 42, &[1, 2, 3]).unwrap();
            });
            let got = b1.recv(0, 42, 3).unwrap();
            assert_eq!(got, vec![1, 2, 3]);
            h.join().unwrap();
        });
    }

    #[test]
    fn out_of_order_tags_are_buffered() {
        let mut backends = ThreadBackend::<i32>::make_group(2);
        let mut b1 = backends.pop().unwrap();
        let mut b0 = backends.pop().unwrap();
        std::thread::scope(|scope| {
            let h = scope.spawn(move || {
                b0.send(1, 2, &[20]).unwrap();
                b0.send(1, 1, &[10]).unwrap();
            });
            let first = b1.recv(0, 1, 1).unwrap();
            let second = b1.recv(0, 2, 1).unwrap();
            assert_eq!(first, vec![10]);
            assert_eq!(second, vec![20]);
            h.join().unwrap();
        });
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let mut backends = ThreadBackend::<i32>::make_group(2);
        let mut b1 = backends.pop().unwrap();
        let mut b0 = backends.pop().unwrap();
        std::thread::scope(|scope| {
            let h = scope.spawn(move || {
                b0.send(1, 1, &[1, 2, 3]).unwrap();
            });
            assert!(b1.recv(0, 1, 2).is_err());
            h.join().unwrap();
        });
    }
}
