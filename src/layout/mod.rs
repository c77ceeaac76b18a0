//! Local storage layouts: the mapping from a global [`Index`] to an offset
//! into a task's local buffer.
//!
//! [`Layout`] is deliberately object-safe (no generics) so a [`crate::data::Data`]
//! container can hold `Box<dyn Layout>` regardless of its element type; the
//! generic traversal helpers ([`pack_range`], [`unpack_range`], [`copy_range`])
//! are free functions parameterized over the buffer's element type instead of
//! trait methods, mirroring the split between an object-safe interface and
//! generic operations over typed slices.

mod compact;
mod sparse;

pub use compact::Compact1D;
pub use sparse::{ExternalCursor, Sparse1D};

use crate::error::Result;
use crate::space::{Index, Range};

/// A local storage layout for one task's share of a [`crate::space::Space`].
///
/// A layout may hold more than one disjoint "section" (contiguous sub-buffer
/// within the same allocation, numbered `0..count()`); `Compact1D` always has
/// exactly one, `Sparse1D` treats its owned range and its external ring as
/// two sections of the same allocation.
pub trait Layout: Send + Sync {
    /// Human-readable summary, surfaced in logs and `describe()` reporting.
    fn describe(&self) -> String;

    /// Total number of local slots this layout addresses, including any
    /// reserved-but-unused tail (e.g. external slots never populated).
    fn local_length(&self) -> u64;

    /// Number of disjoint sections this layout multiplexes.
    fn count(&self) -> u32;

    /// The section owning `idx`, or `-1` if `idx` is not locally held.
    fn section(&self, idx: &Index) -> i32;

    /// The local buffer offset for `idx` within `section`.
    ///
    /// # Errors
    /// Returns an error if `section` does not own `idx`.
    fn offset(&self, section: i32, idx: &Index) -> Result<u64>;

    /// The inverse of `offset`: the global index held at local buffer
    /// position `local_offset`, or `None` if nothing resolves there.
    fn to_global(&self, local_offset: u64) -> Option<Index>;

    /// Decide whether an allocation sized for `old_len` under `old` can be
    /// reused verbatim (no realloc, no re-zero) for `new_len` under `self`.
    ///
    /// A `true` result is a promise: the caller will not reallocate, so any
    /// interval/offset tables private to a concrete layout must remain valid
    /// for every index this layout will resolve.
    fn reuse(&mut self, new_len: u64, old: &dyn Layout, old_len: u64) -> bool;
}

/// Copies at most `cap` elements of `range` addressed by `layout`/`section`
/// out of `buf` and into `out`, advancing `cursor` (caller-owned, initialized
/// to `range.from` before the first call) as it goes.
///
/// Resumable: a caller that cannot afford to walk a whole range in one call
/// (e.g. to interleave with backpressure on a transport) drives this in a
/// loop, re-passing the same `cursor`, until it returns `0`, which happens
/// exactly when `cursor == range.to`.
///
/// # Errors
/// Propagates any error from `layout.offset`.
pub fn pack_range<T: Copy>(
    layout: &dyn Layout,
    section: i32,
    range: &Range,
    buf: &[T],
    out: &mut Vec<T>,
    cursor: &mut Index,
    cap: usize,
) -> Result<usize> {
    let mut n = 0usize;
    while n < cap && range.contains(cursor, 1) {
        let off = layout.offset(section, cursor)?;
        out.push(buf[off as usize]);
        n += 1;
        range.next_idx_1d(cursor);
    }
    Ok(n)
}

/// Writes up to `cap` elements of `src` (read starting at `src[0]`, in
/// `range`'s traversal order) into `buf` at the offsets `layout`/`section`
/// resolve, advancing `cursor` the same way `pack_range` does.
///
/// A caller resuming a prior call passes the remaining suffix of `src` (the
/// elements not yet consumed) alongside the same `cursor`.
///
/// # Errors
/// Propagates any error from `layout.offset`.
pub fn unpack_range<T: Copy>(
    layout: &dyn Layout,
    section: i32,
    range: &Range,
    buf: &mut [T],
    src: &[T],
    cursor: &mut Index,
    cap: usize,
) -> Result<usize> {
    let mut n = 0usize;
    while n < cap && range.contains(cursor, 1) {
        let off = layout.offset(section, cursor)?;
        buf[off as usize] = src[n];
        n += 1;
        range.next_idx_1d(cursor);
    }
    Ok(n)
}

/// Copies up to `cap` elements of `range` directly from one local buffer to
/// another, resolving offsets independently on each side, advancing `cursor`
/// the same way `pack_range` does. Used when a transition keeps data local
/// (no transport) but the old and new layouts disagree on placement.
///
/// # Errors
/// Propagates any error from either layout's `offset`.
pub fn copy_range<T: Copy>(
    src_layout: &dyn Layout,
    src_section: i32,
    src_buf: &[T],
    dst_layout: &dyn Layout,
    dst_section: i32,
    dst_buf: &mut [T],
    range: &Range,
    cursor: &mut Index,
    cap: usize,
) -> Result<usize> {
    let mut n = 0usize;
    while n < cap && range.contains(cursor, 1) {
        let s = src_layout.offset(src_section, cursor)?;
        let d = dst_layout.offset(dst_section, cursor)?;
        dst_buf[d as usize] = src_buf[s as usize];
        n += 1;
        range.next_idx_1d(cursor);
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use compact::Compact1D;

    #[test]
    fn pack_range_resumes_across_multiple_bounded_calls() {
        let layout = Compact1D::new(Range::new_1d(0, 10));
        let buf: Vec<i32> = (0..10).collect();
        let range = Range::new_1d(2, 9);

        let mut out = Vec::new();
        let mut cursor = range.from;
        let first = pack_range(&layout, 0, &range, &buf, &mut out, &mut cursor, 3).unwrap();
        assert_eq!(first, 3);
        assert_eq!(out, vec![2, 3, 4]);

        let second = pack_range(&layout, 0, &range, &buf, &mut out, &mut cursor, 3).unwrap();
        assert_eq!(second, 3);
        let third = pack_range(&layout, 0, &range, &buf, &mut out, &mut cursor, 3).unwrap();
        assert_eq!(third, 1);
        assert_eq!(out, vec![2, 3, 4, 5, 6, 7, 8]);

        let done = pack_range(&layout, 0, &range, &buf, &mut out, &mut cursor, 3).unwrap();
        assert_eq!(done, 0);
    }

    #[test]
    fn unpack_range_resumes_and_copy_range_is_bounded() {
        let layout = Compact1D::new(Range::new_1d(0, 5));
        let src = [10, 20, 30];
        let range = Range::new_1d(1, 4);
        let mut buf = [0; 5];
        let mut cursor = range.from;

        let n1 = unpack_range(&layout, 0, &range, &mut buf, &src, &mut cursor, 2).unwrap();
        assert_eq!(n1, 2);
        let n2 = unpack_range(&layout, 0, &range, &mut buf, &src[n1..], &mut cursor, 2).unwrap();
        assert_eq!(n2, 1);
        assert_eq!(buf, [0, 10, 20, 30, 0]);

        let src_layout = Compact1D::new(Range::new_1d(0, 5));
        let dst_layout = Compact1D::new(Range::new_1d(0, 5));
        let src_buf = [1, 2, 3, 4, 5];
        let mut dst_buf = [0; 5];
        let mut cursor = Range::new_1d(0, 5).from;
        let copied = copy_range(
            &src_layout,
            0,
            &src_buf,
            &dst_layout,
            0,
            &mut dst_buf,
            &Range::new_1d(0, 5),
            &mut cursor,
            2,
        )
        .unwrap();
        assert_eq!(copied, 2);
        assert_eq!(dst_buf, [1, 2, 0, 0, 0]);
    }
}
