// Copyright (c) 2024 Mike Tsao

use super::{Horizontality, OffsetTree, TreeHandle};
use crate::{error::Result, prelude::*};
use delegate::delegate;
use rustc_hash::FxHashMap;
use std::{collections::BTreeSet, sync::Arc};

/// A slice of the timeline: everything that starts, stops, or is still
/// sounding at one offset.
///
/// A [Verticality] is a snapshot. It doesn't change when its tree does, so
/// re-query if you need to see edits. Navigation ([Verticality::next_verticality()]
/// and friends) always asks the live tree, so it's fine to edit the tree
/// between steps.
#[derive(Debug)]
pub struct Verticality<T> {
    start_offset: Offset,
    start_timespans: Vec<Arc<T>>,
    stop_timespans: Vec<Arc<T>>,
    overlap_timespans: Vec<Arc<T>>,
    handle: TreeHandle<T>,
}
impl<T> Clone for Verticality<T> {
    fn clone(&self) -> Self {
        Self {
            start_offset: self.start_offset,
            start_timespans: self.start_timespans.clone(),
            stop_timespans: self.stop_timespans.clone(),
            overlap_timespans: self.overlap_timespans.clone(),
            handle: self.handle.clone(),
        }
    }
}
impl<T> Verticality<T> {
    /// The offset this verticality describes.
    pub fn start_offset(&self) -> Offset {
        self.start_offset
    }

    /// Timespans that start here, ordered by stop offset.
    pub fn start_timespans(&self) -> &[Arc<T>] {
        &self.start_timespans
    }

    /// Timespans that stop here, ordered by start offset.
    pub fn stop_timespans(&self) -> &[Arc<T>] {
        &self.stop_timespans
    }

    /// Timespans that started earlier and stop later.
    pub fn overlap_timespans(&self) -> &[Arc<T>] {
        &self.overlap_timespans
    }

    /// Everything sounding here: start timespans, then overlap timespans.
    pub fn start_and_overlap_timespans(&self) -> impl Iterator<Item = &Arc<T>> {
        self.start_timespans
            .iter()
            .chain(self.overlap_timespans.iter())
    }

    /// How many timespans are sounding here.
    pub fn degree_of_overlap(&self) -> usize {
        self.start_timespans.len() + self.overlap_timespans.len()
    }

    #[allow(missing_docs)]
    pub fn handle(&self) -> &TreeHandle<T> {
        &self.handle
    }
}
impl<T: Timespan> Verticality<T> {
    pub(crate) fn new_from_tree(tree: &OffsetTree<T>, offset: Offset, handle: TreeHandle<T>) -> Self {
        Self {
            start_offset: offset,
            start_timespans: tree.find_timespans_starting_at(offset),
            stop_timespans: tree.find_timespans_stopping_at(offset),
            overlap_timespans: tree.find_timespans_overlapping(offset),
            handle,
        }
    }

    /// The next start offset in the tree, as it is now.
    pub fn next_start_offset(&self) -> Result<Option<Offset>> {
        let tree = self.handle.upgrade()?;
        let next = tree.tree().start_offset_after(self.start_offset);
        Ok(next)
    }

    /// The previous start offset in the tree, as it is now.
    pub fn previous_start_offset(&self) -> Result<Option<Offset>> {
        let tree = self.handle.upgrade()?;
        let previous = tree.tree().start_offset_before(self.start_offset);
        Ok(previous)
    }

    /// The verticality at [Verticality::next_start_offset()], or `None` at the
    /// end of the tree.
    pub fn next_verticality(&self) -> Result<Option<Self>> {
        let tree = self.handle.upgrade()?;
        let next = tree.tree().start_offset_after(self.start_offset);
        Ok(next.map(|offset| tree.verticality_at(offset)))
    }

    /// The verticality at [Verticality::previous_start_offset()], or `None` at
    /// the start of the tree.
    pub fn previous_verticality(&self) -> Result<Option<Self>> {
        let tree = self.handle.upgrade()?;
        let previous = tree.tree().start_offset_before(self.start_offset);
        Ok(previous.map(|offset| tree.verticality_at(offset)))
    }
}
impl<T: MusicalTimespan> Verticality<T> {
    /// Every pitch sounding here.
    pub fn pitch_set(&self) -> BTreeSet<PitchId> {
        self.start_and_overlap_timespans()
            .flat_map(|t| t.pitches())
            .collect()
    }

    /// Every pitch class sounding here.
    pub fn pitch_class_set(&self) -> BTreeSet<PitchClass> {
        self.pitch_set().iter().map(|p| p.pitch_class()).collect()
    }

    /// Asks `rule` whether [Verticality::pitch_set()] is consonant.
    pub fn is_consonant(&self, rule: &impl ConsonanceRule) -> bool {
        rule.is_consonant(&self.pitch_set())
    }

    /// The timespan sounding the lowest pitch. When several do, the one whose
    /// part has the highest [PartUid] wins, and among those the last one
    /// found.
    pub fn bass_timespan(&self) -> Option<Arc<T>> {
        let lowest = *self.pitch_set().iter().next()?;
        self.start_and_overlap_timespans()
            .filter(|t| t.pitches().contains(&lowest))
            .max_by_key(|t| t.part())
            .cloned()
    }

    /// The beat strength of the first timespan starting here.
    pub fn rhythmic_strength(&self) -> Option<f64> {
        self.start_timespans.first().map(|t| t.rhythmic_strength())
    }

    /// The measure containing this offset, as reported by whatever sounds
    /// here.
    pub fn measure_extent(&self) -> Option<TimeRange> {
        self.start_and_overlap_timespans()
            .find_map(|t| t.measure_extent())
    }
}

/// Consecutive verticalities, usually a window produced by
/// [TimespanTree::iterate_verticalities_nwise()](super::TimespanTree::iterate_verticalities_nwise).
#[derive(Debug)]
pub struct VerticalitySequence<T>(Vec<Verticality<T>>);
impl<T> Clone for VerticalitySequence<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}
impl<T> From<Vec<Verticality<T>>> for VerticalitySequence<T> {
    fn from(value: Vec<Verticality<T>>) -> Self {
        Self(value)
    }
}
impl<T> FromIterator<Verticality<T>> for VerticalitySequence<T> {
    fn from_iter<I: IntoIterator<Item = Verticality<T>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
impl<T> VerticalitySequence<T> {
    delegate! {
        to self.0 {
            #[allow(missing_docs)]
            pub fn len(&self) -> usize;
            #[allow(missing_docs)]
            pub fn is_empty(&self) -> bool;
            #[allow(missing_docs)]
            pub fn iter(&self) -> core::slice::Iter<'_, Verticality<T>>;
            #[allow(missing_docs)]
            pub fn first(&self) -> Option<&Verticality<T>>;
            #[allow(missing_docs)]
            pub fn last(&self) -> Option<&Verticality<T>>;
        }
    }

    /// The start offset of each verticality, in order.
    pub fn start_offsets(&self) -> Vec<Offset> {
        self.0.iter().map(|v| v.start_offset()).collect()
    }
}
impl<T: MusicalTimespan> VerticalitySequence<T> {
    /// Regroups the sequence by part. The first verticality contributes what
    /// starts and what is still sounding there; later ones contribute only
    /// what starts. Parts appear in the order they were first seen, and each
    /// [Horizontality] is in chronological order.
    pub fn unwrap(&self) -> Vec<(Option<PartUid>, Horizontality<T>)> {
        let mut index: FxHashMap<Option<PartUid>, usize> = FxHashMap::default();
        let mut groups: Vec<(Option<PartUid>, Vec<Arc<T>>)> = Vec::default();
        let mut add = |timespan: &Arc<T>| {
            let part = timespan.part();
            let i = *index.entry(part).or_insert_with(|| {
                groups.push((part, Vec::default()));
                groups.len() - 1
            });
            groups[i].1.push(Arc::clone(timespan));
        };
        if let Some((first, rest)) = self.0.split_first() {
            let mut opening: Vec<&Arc<T>> = first.start_and_overlap_timespans().collect();
            opening.sort_by_key(|t| (t.start_offset(), t.stop_offset()));
            opening.into_iter().for_each(&mut add);
            rest.iter()
                .flat_map(|v| v.start_timespans().iter())
                .for_each(&mut add);
        }
        groups
            .into_iter()
            .map(|(part, timespans)| (part, Horizontality::new_with(timespans)))
            .collect()
    }
}
