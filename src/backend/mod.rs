//! Transport abstraction for collective `switchto` operations.
//!
//! This core defines the trait contract and ships two reference
//! implementations for running and testing without a real network: a
//! single-process no-op and an in-process multi-thread transport. A
//! production deployment supplies its own [`Backend`] (MPI, TCP, whatever
//! wires up the process group) -- this core never speaks a wire protocol
//! itself.

mod single;
mod thread;

pub use single::SingleProcessBackend;
pub use thread::ThreadBackend;

use crate::error::Result;
use crate::group::Group;

/// Point-to-point transport between tasks in a fixed [`Group`].
///
/// Implementations own exactly one task's endpoint; they are not expected to
/// be shared across threads (`Send` only, not `Sync`) since a task drives
/// its own backend serially.
pub trait Backend<T>: Send {
    fn group(&self) -> Group;

    /// Send `data` to task `to`, tagged `tag`. Blocks until the transport
    /// accepts the payload (not necessarily until the peer has received it).
    ///
    /// # Errors
    /// Returns [`crate::error::CoreError::BackendTransport`] on any
    /// transport-level failure.
    fn send(&mut self, to: usize, tag: u64, data: &[T]) -> Result<()>;

    /// Receive exactly `len` elements tagged `tag` from task `from`. Blocks
    /// until a matching message arrives.
    ///
    /// # Errors
    /// Returns [`crate::error::CoreError::BackendTransport`] on any
    /// transport-level failure, including a length mismatch with what was
    /// actually sent.
    fn recv(&mut self, from: usize, tag: u64, len: usize) -> Result<Vec<T>>;
}

/// Deterministic tag for one `(send, recv)` pairing within a single
/// `switchto` collective: every task derives the same tag for the same
/// logical transfer without negotiating over the wire.
#[must_use]
pub fn transition_tag(transition_seq: u64, from_task: usize, to_task: usize) -> u64 {
    transition_seq
        .wrapping_mul(1_000_003)
        .wrapping_add(from_task as u64 * 1009 + to_task as u64)
}
