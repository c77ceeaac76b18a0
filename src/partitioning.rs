//! A materialized [`RangeList`] bound to the `(Space, Group)` it was computed
//! for, with an optional link back to the partitioning it was derived from.

use crate::group::Group;
use crate::partitioner::Partitioner;
use crate::rangelist::{RangeList, RangeListBuilder};
use crate::space::Space;
use std::fmt;
use std::sync::{Arc, Weak};

/// The result of running a [`Partitioner`] against a `(Space, Group)`.
///
/// Holds the base it was derived from (if any) as a `Weak` reference: a
/// `Partitioning` never keeps its ancestor alive by itself, matching the
/// "no raw self-references" guidance -- a [`crate::data::Data`] container
/// that actually needs the ancestor around holds its own `Arc`.
#[derive(Clone)]
pub struct Partitioning {
    space: Space,
    group: Group,
    range_list: Arc<RangeList>,
    partitioner_name: Arc<str>,
    base: Option<Weak<RangeList>>,
}

impl Partitioning {
    /// Run `partitioner` over `(group, space)`, optionally informed by
    /// `base`'s `RangeList`.
    pub fn compute(
        partitioner: &dyn Partitioner,
        group: Group,
        space: Space,
        base: Option<&Partitioning>,
    ) -> crate::error::Result<Self> {
        let mut builder = RangeListBuilder::new(group.size(), space.clone());
        if partitioner.wants_consolidation() {
            builder = builder.consolidating();
        }
        partitioner.run(&group, &space, base.map(Partitioning::range_list), &mut builder)?;
        Ok(Self {
            space,
            group,
            range_list: Arc::new(builder.finish()?),
            partitioner_name: Arc::from(partitioner.name()),
            base: base.map(|b| Arc::downgrade(&b.range_list)),
        })
    }

    /// Wrap an already-computed `RangeList` (e.g. one round-tripped over a
    /// backend) as a `Partitioning`.
    #[must_use]
    pub fn from_range_list(
        range_list: Arc<RangeList>,
        group: Group,
        space: Space,
        partitioner_name: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            space,
            group,
            range_list,
            partitioner_name: partitioner_name.into(),
            base: None,
        }
    }

    #[must_use]
    pub fn space(&self) -> &Space {
        &self.space
    }

    #[must_use]
    pub fn group(&self) -> &Group {
        &self.group
    }

    #[must_use]
    pub fn range_list(&self) -> &RangeList {
        &self.range_list
    }

    #[must_use]
    pub fn range_list_arc(&self) -> Arc<RangeList> {
        Arc::clone(&self.range_list)
    }

    /// The partitioning this one was derived from, if that ancestor is still
    /// alive somewhere (e.g. held by a [`crate::data::Data`] container).
    #[must_use]
    pub fn base_range_list(&self) -> Option<Arc<RangeList>> {
        self.base.as_ref().and_then(Weak::upgrade)
    }
}

impl fmt::Display for Partitioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Partitioning(via {}, {} tasks, {} entries)",
            self.partitioner_name,
            self.group.size(),
            self.range_list.entries().len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partitioner::All;

    #[test]
    fn compute_binds_space_and_group() {
        let space = Space::new_1d(40);
        let group = Group::new(2, 0);
        let p = Partitioning::compute(&All, group, space.clone(), None).unwrap();
        assert!(p.space().same_identity(&space));
        assert_eq!(p.range_list().total_coverage(1), 80);
        assert!(p.base_range_list().is_none());
    }

    #[test]
    fn derived_partitioning_can_upgrade_base_while_alive() {
        let space = Space::new_1d(40);
        let group = Group::new(2, 0);
        let base = Partitioning::compute(&All, group, space.clone(), None).unwrap();
        let derived = Partitioning::compute(&All, group, space, Some(&base)).unwrap();
        assert!(derived.base_range_list().is_some());
        drop(base);
        assert!(derived.base_range_list().is_none());
    }
}
