// Copyright (c) 2024 Mike Tsao

use super::{indexing::ScoreSource, node::OffsetTreeNode};
use crate::{error::Result, prelude::*};
use rustc_hash::FxHashMap;
use std::{collections::BTreeSet, sync::Arc};

/// An [OffsetTree] indexes timespans by where they start, so that at any
/// offset it can say what starts, what stops, and what is still sounding.
///
/// It's an AVL tree with one node per distinct start offset. Each node also
/// remembers the earliest and latest stop offsets of its whole subtree, which
/// turns stop and overlap queries into pruned descents rather than scans.
///
/// Timespans are held as [Arc]s and are identified by pointer, not by value:
/// [OffsetTree::remove()] removes exactly the [Arc] it's given.
#[derive(Debug)]
pub struct OffsetTree<T> {
    root: Option<Box<OffsetTreeNode<T>>>,
    len: usize,
    source: Option<ScoreSource>,
}
impl<T> Default for OffsetTree<T> {
    fn default() -> Self {
        Self {
            root: None,
            len: 0,
            source: None,
        }
    }
}
impl<T> Clone for OffsetTree<T> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            len: self.len,
            source: self.source.clone(),
        }
    }
}
impl<T> OffsetTree<T> {
    /// The root node, or `None` if the tree is empty.
    pub fn root(&self) -> Option<&OffsetTreeNode<T>> {
        self.root.as_deref()
    }

    /// The number of timespans in the tree.
    pub fn len(&self) -> usize {
        self.len
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Every timespan, ordered by start offset and then by stop offset.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> {
        self.root
            .as_deref()
            .into_iter()
            .flat_map(|root| root.iter())
            .flat_map(|node| node.payload().iter())
    }

    /// The distinct start offsets in the tree, in order.
    pub fn all_offsets(&self) -> Vec<Offset> {
        self.root
            .as_deref()
            .into_iter()
            .flat_map(|root| root.iter())
            .map(|node| node.start_offset())
            .collect()
    }

    /// The smallest start offset in the tree.
    pub fn earliest_start(&self) -> Option<Offset> {
        self.root().map(|root| root.leftmost().start_offset())
    }

    /// The largest start offset in the tree.
    pub fn latest_start(&self) -> Option<Offset> {
        self.root().map(|root| root.rightmost().start_offset())
    }

    /// The smallest stop offset in the tree.
    pub fn earliest_stop(&self) -> Option<Offset> {
        self.root().map(|root| root.earliest_stop_offset())
    }

    /// The largest stop offset in the tree.
    pub fn latest_stop(&self) -> Option<Offset> {
        self.root().map(|root| root.latest_stop_offset())
    }

    /// The first start offset strictly after `offset`, if any.
    pub fn start_offset_after(&self, offset: Offset) -> Option<Offset> {
        self.root()?.start_offset_after(offset)
    }

    /// The last start offset strictly before `offset`, if any.
    pub fn start_offset_before(&self, offset: Offset) -> Option<Offset> {
        self.root()?.start_offset_before(offset)
    }

    /// Every timespan starting exactly at `offset`, ordered by stop offset.
    pub fn find_timespans_starting_at(&self, offset: Offset) -> Vec<Arc<T>> {
        self.root()
            .and_then(|root| root.find(offset))
            .map(|node| node.payload().to_vec())
            .unwrap_or_default()
    }

    /// Describes where this tree's timespans came from, if it was built from a
    /// container walk.
    pub fn source(&self) -> Option<&ScoreSource> {
        self.source.as_ref()
    }

    #[allow(missing_docs)]
    pub fn set_source(&mut self, source: Option<ScoreSource>) {
        self.source = source;
    }
}
impl<T: Timespan> OffsetTree<T> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tree holding the given timespans.
    pub fn new_with<I, A>(timespans: I) -> Result<Self>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arc<T>>,
    {
        let mut r = Self::new();
        r.insert_many(timespans)?;
        Ok(r)
    }

    fn update_aggregates(&mut self) {
        if let Some(root) = self.root.as_deref_mut() {
            root.update_aggregates();
        }
    }

    fn insert_one(&mut self, timespan: Arc<T>) -> Result<()> {
        timespan.check_well_formed()?;
        self.root = Some(OffsetTreeNode::insert(self.root.take(), timespan));
        self.len += 1;
        Ok(())
    }

    fn remove_one(&mut self, timespan: &Arc<T>) -> Result<bool> {
        timespan.check_well_formed()?;
        let start = timespan.start_offset();
        let Some(node) = self.root.as_deref_mut().and_then(|root| root.find_mut(start)) else {
            return Ok(false);
        };
        if !node.remove_from_payload(timespan) {
            return Ok(false);
        }
        if node.is_payload_empty() {
            log::trace!("removing empty node at {start}");
            self.root = OffsetTreeNode::remove(self.root.take(), start);
        }
        self.len -= 1;
        Ok(true)
    }

    /// Adds one timespan. Each call recomputes the cached stop offsets of the
    /// whole tree, so loading many timespans this way is quadratic; use
    /// [OffsetTree::insert_many()] or [OffsetTree::new_with()] for bulk loads.
    pub fn insert(&mut self, timespan: impl Into<Arc<T>>) -> Result<()> {
        self.insert_many([timespan])
    }

    /// Adds timespans one at a time. Stops at the first malformed timespan;
    /// the ones before it stay inserted.
    pub fn insert_many<I, A>(&mut self, timespans: I) -> Result<()>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arc<T>>,
    {
        let mut r = Ok(());
        let mut count = 0;
        for timespan in timespans {
            r = self.insert_one(timespan.into());
            if r.is_err() {
                break;
            }
            count += 1;
        }
        log::debug!("inserted {count} timespans; tree now holds {}", self.len);
        self.update_aggregates();
        r
    }

    /// Removes one timespan. Returns false if it wasn't in the tree.
    pub fn remove(&mut self, timespan: &Arc<T>) -> Result<bool> {
        Ok(self.remove_many([timespan])? == 1)
    }

    /// Removes timespans one at a time, returning how many were found. Stops at
    /// the first malformed timespan; the ones before it stay removed.
    pub fn remove_many<'a, I>(&mut self, timespans: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a Arc<T>>,
        T: 'a,
    {
        let mut r = Ok(0);
        for timespan in timespans {
            match self.remove_one(timespan) {
                Ok(found) => {
                    if let Ok(count) = r.as_mut() {
                        *count += found as usize;
                    }
                }
                Err(e) => {
                    r = Err(e);
                    break;
                }
            }
        }
        log::debug!("removal finished; tree now holds {}", self.len);
        self.update_aggregates();
        r
    }

    /// Swaps `old` for `new`. Returns false, and inserts nothing, if `old`
    /// wasn't in the tree.
    pub fn replace_timespan(&mut self, old: &Arc<T>, new: impl Into<Arc<T>>) -> Result<bool> {
        let new = new.into();
        new.check_well_formed()?;
        if !self.remove(old)? {
            return Ok(false);
        }
        self.insert(new)?;
        Ok(true)
    }

    /// Every timespan stopping exactly at `offset`, ordered by start and then
    /// stop offset.
    pub fn find_timespans_stopping_at(&self, offset: Offset) -> Vec<Arc<T>> {
        let mut results = Vec::default();
        if let Some(root) = self.root() {
            root.collect_stopping_at(offset, &mut results);
        }
        results
    }

    /// Every timespan that starts before `offset` and stops after it, ordered
    /// by start and then stop offset. Timespans that merely touch `offset`
    /// aren't included.
    pub fn find_timespans_overlapping(&self, offset: Offset) -> Vec<Arc<T>> {
        let mut results = Vec::default();
        if let Some(root) = self.root() {
            root.collect_overlapping(offset, &mut results);
        }
        results
    }

    /// The distinct start and stop offsets in the tree, in order.
    pub fn all_time_points(&self) -> Vec<Offset> {
        let points: BTreeSet<Offset> = self
            .iter()
            .flat_map(|t| [t.start_offset(), t.stop_offset()])
            .collect();
        points.into_iter().collect()
    }

    /// How many timespans start at or overlap `offset`.
    pub fn degree_of_overlap_at(&self, offset: Offset) -> usize {
        self.root()
            .and_then(|root| root.find(offset))
            .map_or(0, |node| node.payload().len())
            + self.find_timespans_overlapping(offset).len()
    }

    /// The largest degree of overlap found at any start offset.
    pub fn maximum_overlap(&self) -> Option<usize> {
        self.all_offsets()
            .into_iter()
            .map(|offset| self.degree_of_overlap_at(offset))
            .max()
    }

    /// The smallest degree of overlap found at any start offset.
    pub fn minimum_overlap(&self) -> Option<usize> {
        self.all_offsets()
            .into_iter()
            .map(|offset| self.degree_of_overlap_at(offset))
            .min()
    }

    /// Splits every timespan that overlaps any of `offsets` into two shards
    /// that meet at that offset. Splitting where a boundary already exists
    /// changes nothing.
    pub fn split_at(&mut self, offsets: impl IntoIterator<Item = Offset>) -> Result<()>
    where
        T: Clone,
    {
        for offset in offsets {
            let overlapping = self.find_timespans_overlapping(offset);
            if overlapping.is_empty() {
                continue;
            }
            log::debug!("splitting {} timespans at {offset}", overlapping.len());
            self.remove_many(overlapping.iter())?;
            let mut shards = Vec::with_capacity(overlapping.len() * 2);
            for timespan in overlapping.iter() {
                let (left, right) = timespan.split_at(offset);
                shards.push(left);
                shards.extend(right);
            }
            self.insert_many(shards)?;
        }
        Ok(())
    }

    /// Checks every structural invariant: search-tree order, AVL balance,
    /// cached heights, payload order, and aggregate stop offsets.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(root) = self.root() {
            root.validate(None, None)?;
        }
        let count = self.iter().count();
        if count != self.len {
            return Err(anyhow::anyhow!(
                "tree claims {} timespans but holds {count}",
                self.len
            ));
        }
        Ok(())
    }
}
impl<T: MusicalTimespan> OffsetTree<T> {
    fn find_in_same_part(
        &self,
        timespan: &Arc<T>,
        step: impl Fn(Offset) -> Option<Offset>,
    ) -> Option<Arc<T>> {
        let part = timespan.part();
        let mut offset = step(timespan.start_offset());
        while let Some(o) = offset {
            if let Some(found) = self
                .find_timespans_starting_at(o)
                .into_iter()
                .find(|t| t.part() == part)
            {
                return Some(found);
            }
            offset = step(o);
        }
        None
    }

    /// The first timespan in the same part as `timespan` that starts after it.
    pub fn find_next_in_same_part(&self, timespan: &Arc<T>) -> Option<Arc<T>> {
        self.find_in_same_part(timespan, |o| self.start_offset_after(o))
    }

    /// The last timespan in the same part as `timespan` that starts before it.
    pub fn find_previous_in_same_part(&self, timespan: &Arc<T>) -> Option<Arc<T>> {
        self.find_in_same_part(timespan, |o| self.start_offset_before(o))
    }

    /// Every part that owns a timespan, in order of first appearance.
    pub fn all_parts(&self) -> Vec<Option<PartUid>> {
        let mut seen = rustc_hash::FxHashSet::default();
        self.iter()
            .map(|t| t.part())
            .filter(|part| seen.insert(*part))
            .collect()
    }

    /// Splits this tree into one tree per part, in order of first appearance.
    /// The new trees share timespans with this one.
    pub fn to_partwise_trees(&self) -> Result<Vec<(Option<PartUid>, OffsetTree<T>)>> {
        let mut index: FxHashMap<Option<PartUid>, usize> = FxHashMap::default();
        let mut buckets: Vec<(Option<PartUid>, Vec<Arc<T>>)> = Vec::default();
        for timespan in self.iter() {
            let part = timespan.part();
            let i = *index.entry(part).or_insert_with(|| {
                buckets.push((part, Vec::default()));
                buckets.len() - 1
            });
            buckets[i].1.push(Arc::clone(timespan));
        }
        buckets
            .into_iter()
            .map(|(part, timespans)| {
                let mut tree = OffsetTree::new_with(timespans)?;
                tree.set_source(self.source.clone());
                Ok((part, tree))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        timespans::element::tests::{note_timespan, TestNote},
        timespans::ElementTimespan,
        util::Rng,
        TimespanError,
    };
    use more_asserts::assert_le;

    type Tree = OffsetTree<ElementTimespan<TestNote>>;
    type Ts = Arc<ElementTimespan<TestNote>>;

    fn ts(start: i32, stop: i32) -> Ts {
        Arc::new(note_timespan(start, stop, &[60], 1))
    }

    fn extents(timespans: &[Ts]) -> Vec<(Offset, Offset)> {
        timespans
            .iter()
            .map(|t| (t.start_offset(), t.stop_offset()))
            .collect()
    }

    fn o(value: i32) -> Offset {
        Offset::from(value)
    }

    #[test]
    fn scenario_insert_query_remove() {
        let (a, b, c) = (ts(0, 4), ts(2, 6), ts(5, 9));
        let mut tree = Tree::new_with([a.clone(), b.clone(), c.clone()]).unwrap();
        assert_eq!(tree.len(), 3);
        assert!(tree.validate().is_ok());

        assert_eq!(
            extents(&tree.find_timespans_overlapping(o(3))),
            vec![(o(0), o(4)), (o(2), o(6))]
        );
        assert_eq!(extents(&tree.find_timespans_starting_at(o(2))), vec![(o(2), o(6))]);
        assert_eq!(extents(&tree.find_timespans_overlapping(o(2))), vec![(o(0), o(4))]);
        assert_eq!(extents(&tree.find_timespans_stopping_at(o(6))), vec![(o(2), o(6))]);

        assert!(tree.remove(&b).unwrap());
        assert!(tree.find_timespans_starting_at(o(2)).is_empty());
        assert_eq!(tree.len(), 2);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn removal_is_by_identity() {
        let a = ts(0, 4);
        let twin = ts(0, 4);
        let mut tree = Tree::new_with([a.clone()]).unwrap();
        assert!(!tree.remove(&twin).unwrap(), "an equal but distinct timespan isn't in the tree");
        assert_eq!(tree.len(), 1);
        assert!(tree.remove(&a).unwrap());
        assert!(!tree.remove(&a).unwrap(), "removing twice is a no-op");
        assert!(tree.is_empty());
        assert!(tree.root().is_none());
    }

    #[test]
    fn boundaries() {
        let tree = Tree::new_with([ts(0, 4), ts(2, 6), ts(5, 9)]).unwrap();
        assert_eq!(tree.earliest_start(), Some(o(0)));
        assert_eq!(tree.latest_start(), Some(o(5)));
        assert_eq!(tree.earliest_stop(), Some(o(4)));
        assert_eq!(tree.latest_stop(), Some(o(9)));
        assert_eq!(tree.start_offset_after(o(5)), None);
        assert_eq!(tree.start_offset_before(o(0)), None);
        assert_eq!(tree.all_offsets(), vec![o(0), o(2), o(5)]);
        assert_eq!(
            tree.all_time_points(),
            vec![o(0), o(2), o(4), o(5), o(6), o(9)]
        );

        let empty = Tree::new();
        assert_eq!(empty.earliest_start(), None);
        assert_eq!(empty.latest_stop(), None);
        assert!(empty.find_timespans_overlapping(o(1)).is_empty());
        assert!(empty.validate().is_ok());
    }

    #[test]
    fn zero_length_timespans_start_and_stop_at_the_same_offset() {
        let grace = ts(2, 2);
        let tree = Tree::new_with([ts(0, 4), grace.clone()]).unwrap();
        assert_eq!(extents(&tree.find_timespans_starting_at(o(2))), vec![(o(2), o(2))]);
        assert_eq!(extents(&tree.find_timespans_stopping_at(o(2))), vec![(o(2), o(2))]);
        assert_eq!(extents(&tree.find_timespans_overlapping(o(2))), vec![(o(0), o(4))]);
    }

    #[test]
    fn malformed_timespan_stops_a_batch() {
        let mut tree = Tree::new();
        let good = ts(0, 1);
        let mut bad = note_timespan(0, 1, &[60], 1);
        bad = bad.with_offsets(o(3), o(2));
        let r = tree.insert_many([good.clone(), Arc::new(bad), ts(5, 6)]);
        assert_eq!(
            r,
            Err(TimespanError::InvalidTimespan {
                start: o(3),
                stop: o(2)
            })
        );
        assert_eq!(tree.len(), 1, "items before the bad one stay inserted");
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn split_at_is_idempotent() {
        let mut tree = Tree::new_with([ts(0, 4), ts(2, 6), ts(5, 9)]).unwrap();
        tree.split_at([o(3)]).unwrap();
        let once = extents(&tree.iter().cloned().collect::<Vec<_>>());
        assert_eq!(
            once,
            vec![(o(0), o(3)), (o(2), o(3)), (o(3), o(4)), (o(3), o(6)), (o(5), o(9))]
        );
        tree.split_at([o(3), o(0), o(9)]).unwrap();
        let twice = extents(&tree.iter().cloned().collect::<Vec<_>>());
        assert_eq!(once, twice);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn replace_timespan() {
        let a = ts(0, 4);
        let mut tree = Tree::new_with([a.clone()]).unwrap();
        assert!(tree.replace_timespan(&a, ts(1, 2)).unwrap());
        assert_eq!(extents(&tree.iter().cloned().collect::<Vec<_>>()), vec![(o(1), o(2))]);
        assert!(!tree.replace_timespan(&a, ts(7, 8)).unwrap());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn overlap_statistics() {
        let tree = Tree::new_with([ts(0, 4), ts(0, 2), ts(2, 6), ts(5, 9)]).unwrap();
        // At 0: two start. At 2: one starts, (0,4) overlaps. At 5: one starts,
        // (2,6) overlaps.
        assert_eq!(tree.maximum_overlap(), Some(2));
        assert_eq!(tree.minimum_overlap(), Some(2));
        assert_eq!(tree.degree_of_overlap_at(o(3)), 2);
        assert_eq!(Tree::new().maximum_overlap(), None);
    }

    #[test]
    fn same_part_navigation() {
        let a = Arc::new(note_timespan(0, 1, &[60], 1));
        let b = Arc::new(note_timespan(1, 2, &[62], 2));
        let c = Arc::new(note_timespan(2, 3, &[64], 1));
        let tree = Tree::new_with([a.clone(), b.clone(), c.clone()]).unwrap();
        assert!(Arc::ptr_eq(&tree.find_next_in_same_part(&a).unwrap(), &c));
        assert!(Arc::ptr_eq(&tree.find_previous_in_same_part(&c).unwrap(), &a));
        assert!(tree.find_next_in_same_part(&b).is_none());
        assert_eq!(tree.all_parts(), vec![Some(PartUid(1)), Some(PartUid(2))]);

        let partwise = tree.to_partwise_trees().unwrap();
        assert_eq!(partwise.len(), 2);
        assert_eq!(partwise[0].0, Some(PartUid(1)));
        assert_eq!(partwise[0].1.len(), 2);
        assert_eq!(partwise[1].1.len(), 1);
    }

    #[test]
    fn single_inserts_match_a_bulk_load() {
        let spans: Vec<_> = [(0, 4), (2, 3), (2, 9), (5, 6), (1, 2), (7, 8)]
            .into_iter()
            .map(|(start, stop)| ts(start, stop))
            .collect();
        let bulk = Tree::new_with(spans.iter().cloned()).unwrap();
        let mut single = Tree::new();
        for span in spans.iter() {
            single.insert(span.clone()).unwrap();
        }
        let (a, b) = (bulk.root().unwrap(), single.root().unwrap());
        assert_eq!(a.earliest_stop_offset(), b.earliest_stop_offset());
        assert_eq!(a.latest_stop_offset(), b.latest_stop_offset());
        assert_eq!(b.latest_stop_offset(), o(9));
        assert_eq!(
            extents(&bulk.iter().cloned().collect::<Vec<_>>()),
            extents(&single.iter().cloned().collect::<Vec<_>>())
        );
        assert!(single.validate().is_ok());
    }

    #[test]
    fn randomized_inserts_and_removes_keep_every_invariant() {
        let mut rng = Rng::new_with_seed(31337);
        let mut tree = Tree::new();
        let mut reference: Vec<Ts> = Vec::default();
        for round in 0..600 {
            if reference.is_empty() || rng.rand_range(0..3) > 0 {
                let extent = rng.random_extent(40, 8);
                let t = Arc::new(
                    ElementTimespan::new_with(TestNote::default(), extent.start(), extent.end())
                        .unwrap(),
                );
                reference.push(t.clone());
                tree.insert(t).unwrap();
            } else {
                let i = rng.rand_range(0..reference.len() as u64) as usize;
                let t = reference.swap_remove(i);
                assert!(tree.remove(&t).unwrap());
            }
            if let Err(e) = tree.validate() {
                panic!("round {round}: {e}");
            }
        }

        let mut expected = extents(&reference);
        expected.sort();
        let actual = extents(&tree.iter().cloned().collect::<Vec<_>>());
        assert_eq!(actual, expected);

        if let Some(root) = tree.root() {
            // AVL height bound: h < 1.45 log2(n + 2).
            let bound = 1.45 * ((tree.len() + 2) as f64).log2();
            assert_le!(root.height() as f64, bound);
        }
    }
}
