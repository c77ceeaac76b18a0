//! Sparse layout: a directly-owned contiguous range plus a fixed-capacity
//! "external" ring of individually addressed indices (halo/ghost slots
//! requested by local computation but owned by another task).

use super::Layout;
use crate::error::{CoreError, Result};
use crate::space::{Index, Range};
use std::collections::BTreeMap;

/// Assigns ring slots to external indices as they are first encountered
/// during construction of a [`Sparse1D`] layout.
///
/// Scoped to a single construction call -- this core does not grow an
/// external ring after a layout is built (see the non-goal on dynamic
/// external-index growth), so a cursor is never retained as part of a
/// layout's own identity.
pub struct ExternalCursor {
    next_slot: u64,
    capacity: u64,
}

impl ExternalCursor {
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self {
            next_slot: 0,
            capacity,
        }
    }

    /// Hand out the next free ring slot.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyExternalRing`] once `capacity` slots have
    /// all been handed out.
    pub fn acquire(&mut self) -> Result<u64> {
        if self.next_slot >= self.capacity {
            return Err(CoreError::EmptyExternalRing);
        }
        let slot = self.next_slot;
        self.next_slot += 1;
        Ok(slot)
    }
}

/// Section `0`: the directly owned contiguous range, `offset = idx - lo`.
/// Section `1`: the external ring, `offset = owned.size() + slot`.
#[derive(Clone, Debug)]
pub struct Sparse1D {
    owned: Range,
    external_by_index: Vec<(i64, u64)>,
    reserved_external: u64,
}

impl Sparse1D {
    /// Builds a fresh interval map for `external` (deduplicated, indices
    /// already inside `owned` are dropped), assigning ring slots in
    /// first-seen order via `cursor`.
    ///
    /// # Errors
    /// Returns an error if `cursor` cannot supply enough slots for the
    /// distinct external indices encountered.
    pub fn build(
        owned: Range,
        external: impl IntoIterator<Item = i64>,
        cursor: &mut ExternalCursor,
    ) -> Result<Self> {
        let mut seen: BTreeMap<i64, u64> = BTreeMap::new();
        for g in external {
            if g >= owned.from.i[0] && g < owned.to.i[0] {
                continue;
            }
            if seen.contains_key(&g) {
                continue;
            }
            let slot = cursor.acquire()?;
            seen.insert(g, slot);
        }
        let reserved_external = seen.len() as u64;
        Ok(Self {
            owned,
            external_by_index: seen.into_iter().collect(),
            reserved_external,
        })
    }

    /// Builds a layout for a new owned range, inheriting `old`'s interval
    /// map verbatim when doing so would not change `local_length`.
    ///
    /// This is tied strictly to whether `local_length` changes, independent
    /// of whatever [`Layout::reuse`] separately decides about the backing
    /// allocation -- a resized owned range with the same external set and
    /// the same total length keeps its existing slot assignment so a
    /// concurrent pack/unpack elsewhere referencing the old slots stays
    /// valid.
    ///
    /// # Errors
    /// Returns an error if no `old` is given and building a fresh map from
    /// `external` runs out of ring capacity.
    pub fn build_inheriting(
        owned: Range,
        external: impl IntoIterator<Item = i64>,
        old: Option<&Sparse1D>,
        cursor: &mut ExternalCursor,
    ) -> Result<Self> {
        if let Some(old) = old {
            let candidate_len = owned.size(1) + old.reserved_external;
            if candidate_len == old.local_length() {
                return Ok(Self {
                    owned,
                    external_by_index: old.external_by_index.clone(),
                    reserved_external: old.reserved_external,
                });
            }
        }
        Self::build(owned, external, cursor)
    }

    #[must_use]
    pub fn owned_range(&self) -> Range {
        self.owned
    }

    #[must_use]
    pub fn external_len(&self) -> u64 {
        self.reserved_external
    }
}

impl Layout for Sparse1D {
    fn describe(&self) -> String {
        format!(
            "Sparse1D(owned {}, {} external)",
            self.owned,
            self.external_by_index.len()
        )
    }

    fn local_length(&self) -> u64 {
        self.owned.size(1) + self.reserved_external
    }

    fn count(&self) -> u32 {
        2
    }

    fn section(&self, idx: &Index) -> i32 {
        if idx.i[0] >= self.owned.from.i[0] && idx.i[0] < self.owned.to.i[0] {
            0
        } else if self
            .external_by_index
            .binary_search_by_key(&idx.i[0], |&(g, _)| g)
            .is_ok()
        {
            1
        } else {
            -1
        }
    }

    fn offset(&self, section: i32, idx: &Index) -> Result<u64> {
        match section {
            0 => {
                if idx.i[0] < self.owned.from.i[0] || idx.i[0] >= self.owned.to.i[0] {
                    return Err(CoreError::OutOfSpace {
                        index: *idx,
                        dims: 1,
                        extents: [self.owned.size(1) as i64, 0, 0],
                    });
                }
                Ok((idx.i[0] - self.owned.from.i[0]) as u64)
            }
            1 => {
                let pos = self
                    .external_by_index
                    .binary_search_by_key(&idx.i[0], |&(g, _)| g)
                    .map_err(|_| CoreError::EmptyExternalRing)?;
                Ok(self.owned.size(1) + self.external_by_index[pos].1)
            }
            _ => Err(CoreError::UnsupportedFlags {
                reason: format!("sparse layout has no section {section}"),
            }),
        }
    }

    fn to_global(&self, local_offset: u64) -> Option<Index> {
        let owned_len = self.owned.size(1);
        if local_offset < owned_len {
            return Some(Index::of(self.owned.from.i[0] + local_offset as i64));
        }
        let slot = local_offset - owned_len;
        self.external_by_index
            .iter()
            .find(|&&(_, s)| s == slot)
            .map(|&(g, _)| Index::of(g))
    }

    fn reuse(&mut self, new_len: u64, old: &dyn Layout, old_len: u64) -> bool {
        if new_len == 0 {
            return true;
        }
        new_len <= old_len && self.to_global(0) == old.to_global(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owned_indices_resolve_directly() {
        let mut cursor = ExternalCursor::new(4);
        let l = Sparse1D::build(Range::new_1d(10, 20), [5, 25, 5, 30], &mut cursor).unwrap();
        assert_eq!(l.section(&Index::of(15)), 0);
        assert_eq!(l.offset(0, &Index::of(15)).unwrap(), 5);
    }

    #[test]
    fn external_indices_dedupe_and_assign_stable_slots() {
        let mut cursor = ExternalCursor::new(4);
        let l = Sparse1D::build(Range::new_1d(10, 20), [5, 25, 5, 30], &mut cursor).unwrap();
        assert_eq!(l.external_len(), 3);
        assert_eq!(l.section(&Index::of(5)), 1);
        assert_eq!(l.section(&Index::of(25)), 1);
        assert_eq!(l.section(&Index::of(30)), 1);
        let o5 = l.offset(1, &Index::of(5)).unwrap();
        let o25 = l.offset(1, &Index::of(25)).unwrap();
        let o30 = l.offset(1, &Index::of(30)).unwrap();
        let owned_len = l.owned_range().size(1);
        for off in [o5, o25, o30] {
            assert!(off >= owned_len && off < owned_len + 3);
        }
    }

    #[test]
    fn ring_exhaustion_is_an_error() {
        let mut cursor = ExternalCursor::new(1);
        let err = Sparse1D::build(Range::new_1d(0, 5), [10, 11], &mut cursor);
        assert!(err.is_err());
    }

    #[test]
    fn inheriting_keeps_old_map_when_local_length_unchanged() {
        let mut cursor = ExternalCursor::new(2);
        let old = Sparse1D::build(Range::new_1d(0, 10), [20, 21], &mut cursor).unwrap();
        let mut cursor2 = ExternalCursor::new(2);
        let renewed =
            Sparse1D::build_inheriting(Range::new_1d(1, 11), [], Some(&old), &mut cursor2)
                .unwrap();
        assert_eq!(renewed.external_len(), 2);
        assert_eq!(
            renewed.offset(1, &Index::of(20)).unwrap(),
            old.offset(1, &Index::of(20)).unwrap()
        );
    }
}
