//! Degenerate backend for a group of exactly one task: every `switchto` is
//! purely local, so no send/recv should ever be issued against it.

use super::Backend;
use crate::error::{CoreError, Result};
use crate::group::Group;
use std::marker::PhantomData;

pub struct SingleProcessBackend<T> {
    group: Group,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SingleProcessBackend<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            group: Group::new(1, 0),
            _marker: PhantomData,
        }
    }
}

impl<T> Default for SingleProcessBackend<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Backend<T> for SingleProcessBackend<T> {
    fn group(&self) -> Group {
        self.group
    }

    fn send(&mut self, to: usize, _tag: u64, _data: &[T]) -> Result<()> {
        Err(CoreError::BackendTransport {
            message: format!("single-process backend cannot send to task {to}"),
        })
    }

    fn recv(&mut self, from: usize, _tag: u64, _len: usize) -> Result<Vec<T>> {
        Err(CoreError::BackendTransport {
            message: format!("single-process backend cannot receive from task {from}"),
        })
    }
}
