//! Partitioning, layout, and data-transition core for distributing a 1-D
//! (up to 3-D addressable, 1-D partitioned) index space across cooperating
//! tasks.
//!
//! A [`Space`](space::Space) describes the index domain. A
//! [`Partitioner`](partitioner::Partitioner) is a pure function from
//! `(group, space)` to a [`RangeList`](rangelist::RangeList) assigning
//! ranges of that domain to tasks. A [`Layout`](layout::Layout) maps global
//! indices within a task's assigned ranges to offsets into a local buffer --
//! [`Compact1D`](layout::Compact1D) for dense ownership,
//! [`Sparse1D`](layout::Sparse1D) when a task also needs read access to a
//! fixed set of indices it does not own. [`Data`](data::Data) binds a
//! typed buffer to a `(Space, Group)` pair and a current partitioning, and
//! [`Data::switchto`] drives the [`TransitionPlan`](transition::TransitionPlan)
//! that moves values between partitionings over a [`Backend`](backend::Backend).
//!
//! # Quick start
//!
//! ```
//! use taskspace::backend::SingleProcessBackend;
//! use taskspace::data::Data;
//! use taskspace::group::Group;
//! use taskspace::partitioner::Block;
//! use taskspace::space::Space;
//!
//! let space = Space::new_1d(100);
//! let group = Group::new(1, 0);
//! let backend = Box::new(SingleProcessBackend::<f64>::new());
//! let data = Data::new(space, group, &Block::new(0), backend, 0.0).unwrap();
//! assert_eq!(data.map_def1().0.len(), 100);
//! ```
//!
//! # Module overview
//! - [`space`]: the index domain and its value types.
//! - [`group`]: task-group membership.
//! - [`rangelist`]: sorted per-task range collections and their builder.
//! - [`partitioner`]: partitioner trait and the built-in partitioners.
//! - [`partitioning`]: a materialized `RangeList` bound to a `(Space, Group)`.
//! - [`layout`]: local storage layouts (`Compact1D`, `Sparse1D`) and the
//!   generic pack/unpack/copy traversal helpers.
//! - [`mapping`]: a typed buffer bound to a layout.
//! - [`transition`]: the transition planner.
//! - [`backend`]: the transport trait and its two reference
//!   implementations.
//! - [`data`]: the container type tying all of the above together.
//! - [`metrics`] (feature `metrics`): transition bookkeeping.
//! - [`error`]: the crate's error type.

pub mod backend;
pub mod data;
pub mod error;
pub mod group;
pub mod layout;
pub mod mapping;
pub mod partitioner;
pub mod partitioning;
pub mod rangelist;
pub mod space;
pub mod transition;

#[cfg(feature = "metrics")]
pub mod metrics;

pub use error::{CoreError, Result};
