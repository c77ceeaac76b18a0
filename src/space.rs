//! Immutable global index domain and its value types.
//!
//! [`Space`] describes the extents of a `d`-dimensional index domain
//! (`d` in `1..=3`). [`Index`] is a value object of three signed integers;
//! only the first `d` are meaningful for a given `Space`. [`Range`] is a
//! half-open hyper-rectangle over a `Space`.

use std::fmt;
use std::sync::Arc;

/// A point in an index domain. Always carries three coordinates; a `Space`
/// with `dims < 3` simply ignores the trailing ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Index {
    pub i: [i64; 3],
}

impl Index {
    #[must_use]
    pub fn new(i0: i64, i1: i64, i2: i64) -> Self {
        Self { i: [i0, i1, i2] }
    }

    #[must_use]
    pub fn of(i0: i64) -> Self {
        Self::new(i0, 0, 0)
    }
}

struct SpaceInner {
    dims: usize,
    size: [i64; 3],
}

/// An immutable global index domain. Cheap to clone (an `Arc` handle);
/// identity is the underlying allocation, matching the "interned per runtime
/// instance" requirement -- two `Space`s built from the same extents are
/// distinct identities unless explicitly cloned from one another.
#[derive(Clone)]
pub struct Space {
    inner: Arc<SpaceInner>,
}

impl Space {
    /// Construct a `d`-dimensional space. `size` gives the extent of each of
    /// the first `d` dimensions; trailing entries are ignored.
    ///
    /// # Panics
    /// Panics if `dims` is not in `1..=3` or any meaningful extent is negative.
    #[must_use]
    pub fn new(dims: usize, size: [i64; 3]) -> Self {
        assert!((1..=3).contains(&dims), "space dimensionality must be 1..=3");
        for &s in &size[..dims] {
            assert!(s >= 0, "space extent must be non-negative");
        }
        Self {
            inner: Arc::new(SpaceInner { dims, size }),
        }
    }

    /// Convenience constructor for the common 1-D case.
    #[must_use]
    pub fn new_1d(size: i64) -> Self {
        Self::new(1, [size, 0, 0])
    }

    #[must_use]
    pub fn dims(&self) -> usize {
        self.inner.dims
    }

    #[must_use]
    pub fn size(&self) -> [i64; 3] {
        self.inner.size
    }

    #[must_use]
    pub fn extent(&self, dim: usize) -> i64 {
        self.inner.size[dim]
    }

    /// Total number of indices in the space.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.inner.size[..self.inner.dims]
            .iter()
            .map(|&s| s as u64)
            .product()
    }

    /// Identity equality: true iff `self` and `other` are clones of the same
    /// constructed space.
    #[must_use]
    pub fn same_identity(&self, other: &Space) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// True iff `idx`'s meaningful coordinates all fall within `[0, size)`.
    #[must_use]
    pub fn contains(&self, idx: &Index) -> bool {
        (0..self.inner.dims).all(|d| idx.i[d] >= 0 && idx.i[d] < self.inner.size[d])
    }

    /// The full range covering this space: `[0, size)` in every dimension.
    #[must_use]
    pub fn full_range(&self) -> Range {
        let mut to = Index::default();
        to.i[..self.inner.dims].copy_from_slice(&self.inner.size[..self.inner.dims]);
        Range {
            from: Index::default(),
            to,
        }
    }
}

impl fmt::Debug for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Space({}d, {:?})",
            self.inner.dims,
            &self.inner.size[..self.inner.dims]
        )
    }
}

/// A half-open hyper-rectangle `[from, to)` over a `Space`. Empty iff any
/// dimension has `from >= to`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Range {
    pub from: Index,
    pub to: Index,
}

impl Range {
    #[must_use]
    pub fn new(from: Index, to: Index) -> Self {
        Self { from, to }
    }

    /// 1-D convenience constructor: `[from, to)` in dimension 0.
    #[must_use]
    pub fn new_1d(from: i64, to: i64) -> Self {
        Self::new(Index::of(from), Index::of(to))
    }

    #[must_use]
    pub fn is_empty(&self, dims: usize) -> bool {
        (0..dims).any(|d| self.from.i[d] >= self.to.i[d])
    }

    /// `prod(to[i] - from[i])` over the meaningful dimensions. Zero if empty.
    #[must_use]
    pub fn size(&self, dims: usize) -> u64 {
        if self.is_empty(dims) {
            return 0;
        }
        (0..dims)
            .map(|d| (self.to.i[d] - self.from.i[d]) as u64)
            .product()
    }

    #[must_use]
    pub fn contains(&self, idx: &Index, dims: usize) -> bool {
        (0..dims).all(|d| idx.i[d] >= self.from.i[d] && idx.i[d] < self.to.i[d])
    }

    /// True iff `self` lies entirely within `outer` in every meaningful dim.
    #[must_use]
    pub fn within(&self, outer: &Range, dims: usize) -> bool {
        (0..dims).all(|d| self.from.i[d] >= outer.from.i[d] && self.to.i[d] <= outer.to.i[d])
    }

    /// The overlap of `self` and `other`, or `None` if disjoint (in 1-D: the
    /// usual half-open-interval intersection).
    #[must_use]
    pub fn intersect_1d(&self, other: &Range) -> Option<Range> {
        let from = self.from.i[0].max(other.from.i[0]);
        let to = self.to.i[0].min(other.to.i[0]);
        if from < to {
            Some(Range::new_1d(from, to))
        } else {
            None
        }
    }

    /// 1-D-only lexicographic successor. Returns `false` exactly when `idx`
    /// reaches `self.to` -- this core fixes sparse/compact layouts at 1-D, so
    /// there is no multi-dimensional carry to define (see crate docs on the
    /// upstream `next_idx` open question).
    pub(crate) fn next_idx_1d(&self, idx: &mut Index) -> bool {
        idx.i[0] += 1;
        idx.i[0] < self.to.i[0]
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.from.i[0], self.to.i[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_identity_is_per_construction() {
        let a = Space::new_1d(10);
        let b = Space::new_1d(10);
        let c = a.clone();
        assert!(!a.same_identity(&b));
        assert!(a.same_identity(&c));
    }

    #[test]
    fn range_size_and_emptiness() {
        let r = Range::new_1d(2, 5);
        assert_eq!(r.size(1), 3);
        assert!(!r.is_empty(1));
        let empty = Range::new_1d(5, 5);
        assert!(empty.is_empty(1));
        assert_eq!(empty.size(1), 0);
    }

    #[test]
    fn full_range_covers_space() {
        let s = Space::new_1d(100);
        let r = s.full_range();
        assert_eq!(r, Range::new_1d(0, 100));
    }
}
