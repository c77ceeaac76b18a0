//! A typed local buffer bound to a [`Layout`].

use crate::error::{CoreError, Result};
use crate::layout::Layout;
use crate::space::{Index, Range};

/// One task's local storage for one transition: a buffer plus the layout
/// that interprets it.
///
/// `map_no` mirrors the `mapNo` a [`crate::rangelist::RangeList`] assigns a
/// task's entries; a container with more than one disjoint range owned by
/// the same task holds one `Mapping` per `map_no`.
pub struct Mapping<T> {
    buf: Vec<T>,
    layout: Box<dyn Layout>,
    map_no: i32,
}

impl<T: Copy + Default> Mapping<T> {
    /// Allocates a zero-initialized buffer sized to `layout.local_length()`.
    #[must_use]
    pub fn allocate(layout: Box<dyn Layout>, map_no: i32) -> Self {
        let len = layout.local_length() as usize;
        Self {
            buf: vec![T::default(); len],
            layout,
            map_no,
        }
    }
}

impl<T> Mapping<T> {
    #[must_use]
    pub fn from_buf(buf: Vec<T>, layout: Box<dyn Layout>, map_no: i32) -> Self {
        debug_assert_eq!(buf.len(), layout.local_length() as usize);
        Self { buf, layout, map_no }
    }

    #[must_use]
    pub fn map_no(&self) -> i32 {
        self.map_no
    }

    #[must_use]
    pub fn layout(&self) -> &dyn Layout {
        self.layout.as_ref()
    }

    #[must_use]
    pub fn buf(&self) -> &[T] {
        &self.buf
    }

    #[must_use]
    pub fn buf_mut(&mut self) -> &mut [T] {
        &mut self.buf
    }

    /// Splits into the buffer and layout as disjoint borrows, for callers
    /// that need to mutate values while still consulting the layout.
    #[must_use]
    pub fn split_mut(&mut self) -> (&mut [T], &dyn Layout) {
        (&mut self.buf, self.layout.as_ref())
    }

    /// Resolve `idx` to a reference into the local buffer, or `None` if this
    /// mapping does not own `idx` in any of its layout's sections.
    #[must_use]
    pub fn get(&self, idx: &Index) -> Option<&T> {
        let section = self.layout.section(idx);
        if section < 0 {
            return None;
        }
        self.layout.offset(section, idx).ok().map(|o| &self.buf[o as usize])
    }

    /// Resolve `idx` to a mutable reference into the local buffer, or `None`
    /// if this mapping does not own `idx`.
    pub fn get_mut(&mut self, idx: &Index) -> Option<&mut T> {
        let section = self.layout.section(idx);
        if section < 0 {
            return None;
        }
        let off = self.layout.offset(section, idx).ok()?;
        Some(&mut self.buf[off as usize])
    }

    /// Replace this mapping's buffer and layout in place, reusing the
    /// existing allocation when `layout.reuse` says it fits.
    ///
    /// # Errors
    /// Returns [`CoreError::LayoutReuseMismatch`] if `layout.reuse` claims an
    /// allocation fits but the current buffer is actually shorter than the
    /// new layout needs -- a bug in the `Layout` impl, not a caller error.
    pub fn switch_to(&mut self, mut layout: Box<dyn Layout>, default: T) -> Result<()>
    where
        T: Copy,
    {
        let old_len = self.layout.local_length();
        let new_len = layout.local_length();
        if layout.reuse(new_len, self.layout.as_ref(), old_len) {
            if (self.buf.len() as u64) < new_len {
                return Err(CoreError::LayoutReuseMismatch {
                    needed: new_len,
                    have: self.buf.len() as u64,
                });
            }
            self.buf.resize(new_len as usize, default);
        } else {
            self.buf = vec![default; new_len as usize];
        }
        self.layout = layout;
        Ok(())
    }

    /// Every global index this mapping's owned section (`0`) covers, given
    /// the range it was built against. Used by the transition planner to
    /// enumerate what a mapping currently holds.
    #[must_use]
    pub fn owned_len(&self) -> u64 {
        self.layout.local_length()
    }

    /// Global index -> local buffer offset, or `None` if unmapped here.
    #[must_use]
    pub fn global_to_local(&self, idx: &Index) -> Option<u64> {
        let section = self.layout.section(idx);
        if section < 0 {
            return None;
        }
        self.layout.offset(section, idx).ok()
    }

    /// Local buffer offset -> global index, or `None` if out of range.
    #[must_use]
    pub fn local_to_global(&self, local_offset: u64) -> Option<Index> {
        self.layout.to_global(local_offset)
    }
}

/// Iterate every index in `range` (1-D only, matching the rest of this
/// core's traversal helpers).
#[must_use]
pub fn indices_in(range: &Range) -> Vec<Index> {
    let mut out = Vec::new();
    let mut idx = range.from;
    if range.is_empty(1) {
        return out;
    }
    loop {
        out.push(idx);
        if !range.next_idx_1d(&mut idx) {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Compact1D;

    #[test]
    fn allocate_sizes_buffer_to_layout() {
        let layout = Box::new(Compact1D::new(Range::new_1d(0, 10)));
        let m = Mapping::<f64>::allocate(layout, 0);
        assert_eq!(m.buf().len(), 10);
    }

    #[test]
    fn get_resolves_owned_indices_only() {
        let layout = Box::new(Compact1D::new(Range::new_1d(5, 10)));
        let mut m = Mapping::<i32>::allocate(layout, 0);
        *m.get_mut(&Index::of(7)).unwrap() = 42;
        assert_eq!(*m.get(&Index::of(7)).unwrap(), 42);
        assert!(m.get(&Index::of(20)).is_none());
    }

    #[test]
    fn indices_in_walks_the_range() {
        let idxs = indices_in(&Range::new_1d(3, 6));
        assert_eq!(idxs, vec![Index::of(3), Index::of(4), Index::of(5)]);
    }

    #[test]
    fn switch_to_reuses_the_allocation_when_position_is_stable() {
        let mut m = Mapping::<i64>::allocate(Box::new(Compact1D::new(Range::new_1d(0, 10))), 0);
        for (off, v) in m.buf_mut().iter_mut().enumerate() {
            *v = off as i64;
        }
        m.switch_to(Box::new(Compact1D::new(Range::new_1d(0, 5))), -1)
            .unwrap();
        assert_eq!(m.buf(), &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn switch_to_reallocates_when_the_lower_bound_shifts() {
        let mut m = Mapping::<i64>::allocate(Box::new(Compact1D::new(Range::new_1d(0, 10))), 0);
        for v in m.buf_mut().iter_mut() {
            *v = 7;
        }
        m.switch_to(Box::new(Compact1D::new(Range::new_1d(3, 8))), -1)
            .unwrap();
        assert_eq!(m.buf(), &[-1, -1, -1, -1, -1]);
    }
}
