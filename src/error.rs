//! Fatal error kinds for the partitioning/layout/transition core.
//!
//! Every variant here corresponds to a precondition violation or collective
//! failure that the core treats as unrecoverable: callers are expected to
//! abort the process group on `Err`, never retry or partially apply a
//! transition. See crate-level docs for the full rationale.

use crate::space::Index;

/// Fatal error produced by the core. There is no recoverable path: every
/// variant here is a precondition violation or collective failure.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    /// A partitioner emitted a range, or an offset computation resolved an
    /// index, outside the bounds of the governing `Space`.
    #[error("index {index:?} lies outside space of dimensionality {dims} and extents {extents:?}")]
    OutOfSpace {
        index: Index,
        dims: usize,
        extents: [i64; 3],
    },

    /// A weight function supplied to `Block` returned a non-finite value.
    #[error("partitioner weight function returned a non-finite value")]
    NonFinitePartitionWeight,

    /// The builder's map-number bookkeeping was violated; unreachable given
    /// the public builder API, kept as a defensive check.
    #[error("duplicate mapNo {map_no} assigned to task {task}")]
    DuplicateMapNo { task: usize, map_no: i32 },

    /// The backend observed that not every task in the group issued the same
    /// target partitioning/flags for a `switchto` call.
    #[error("switchto was not called collectively by every task in the group")]
    NonCollectiveSwitch,

    /// A `Backend` failed to complete a send/recv during a collective.
    #[error("backend transport failure during collective: {message}")]
    BackendTransport { message: String },

    /// `Sparse1D::offset` resolved an external index but
    /// `numberOfExternalValues` is zero.
    #[error("sparse layout has no reserved external slots but resolved an external index")]
    EmptyExternalRing,

    /// Internal consistency guard: `reuse` accepted an allocation that does
    /// not actually fit the new layout's requirements.
    #[error("layout reuse accepted an undersized allocation (need {needed}, have {have})")]
    LayoutReuseMismatch { needed: u64, have: u64 },

    /// A requested data-flow flag combination is not supported (e.g.
    /// `ReduceOut`, which this spec reserves but does not implement).
    #[error("unsupported transition flag combination: {reason}")]
    UnsupportedFlags { reason: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
