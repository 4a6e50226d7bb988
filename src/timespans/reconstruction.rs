// Copyright (c) 2024 Mike Tsao

//! Rebuilds scores from an [OffsetTree]: either one flattened timeline of
//! chords and rests, or one timeline per part. Rendering the result as
//! notation is up to the caller.

use super::{OffsetTree, ReconstructionSettings, TimespanTree};
use crate::{error::Result, prelude::*};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, sync::Arc};
use strum_macros::{Display, EnumIter, IntoStaticStr};

/// What a [ReconstructedEvent] sounds like.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    EnumIter,
    Eq,
    Hash,
    IntoStaticStr,
    PartialEq,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EventKind {
    /// Nothing sounds.
    Rest,
    /// A single pitch.
    Note,
    /// Any number of pitches sounding together.
    Chord,
}

/// One synthesized event of a reconstructed timeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReconstructedEvent {
    #[allow(missing_docs)]
    pub kind: EventKind,
    /// Where the event starts and stops.
    pub extent: TimeRange,
    /// Every pitch sounding during the event.
    pub pitches: BTreeSet<PitchId>,
    /// The pitches that carry over from the previous event and should be
    /// tied to it.
    pub tied_pitches: BTreeSet<PitchId>,
}
impl ReconstructedEvent {
    #[allow(missing_docs)]
    pub fn is_rest(&self) -> bool {
        self.kind == EventKind::Rest
    }
}

/// One part's reconstructed timeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReconstructedPart {
    #[allow(missing_docs)]
    pub part: Option<PartUid>,
    /// Events in order. They cover the whole tree's range with no gaps.
    pub events: Vec<ReconstructedEvent>,
}

impl<T: MusicalTimespan + Clone> OffsetTree<T> {
    // A copy of this tree that's been trimmed and split per `settings`, along
    // with the offsets it was split at.
    fn prepare_for_reconstruction(
        &self,
        settings: &ReconstructionSettings,
    ) -> Result<(Self, Vec<Offset>)> {
        let mut tree = self.clone();
        if !settings.include_zero_length {
            let zero_length: Vec<Arc<T>> = tree
                .iter()
                .filter(|t| t.duration() == Offset::zero())
                .cloned()
                .collect();
            if !zero_length.is_empty() {
                log::debug!("leaving out {} zero-length timespans", zero_length.len());
                tree.remove_many(zero_length.iter())?;
            }
        }
        let offsets = settings.split_offsets(
            self.source()
                .map(|source| source.measure_offsets.as_slice()),
        );
        tree.split_at(offsets.iter().copied())?;
        Ok((tree, offsets))
    }

    // One event per pair of consecutive `points`.
    fn events_between(&self, points: &[Offset], chords_for_single_pitches: bool) -> Vec<ReconstructedEvent> {
        points
            .windows(2)
            .map(|pair| {
                let (start, stop) = (pair[0], pair[1]);
                let starting = self.find_timespans_starting_at(start);
                let overlapping = self.find_timespans_overlapping(start);
                let stopping = self.find_timespans_stopping_at(start);

                let mut pitches = BTreeSet::default();
                let mut tied_pitches = BTreeSet::default();
                for timespan in overlapping.iter() {
                    let p = timespan.pitches();
                    tied_pitches.extend(p.iter().copied());
                    pitches.extend(p);
                }
                for timespan in starting.iter() {
                    let p = timespan.pitches();
                    if stopping.iter().any(|s| timespan.is_continuation_of(s)) {
                        tied_pitches.extend(p.iter().copied());
                    }
                    pitches.extend(p);
                }
                let kind = match pitches.len() {
                    0 => EventKind::Rest,
                    1 if !chords_for_single_pitches => EventKind::Note,
                    _ => EventKind::Chord,
                };
                ReconstructedEvent {
                    kind,
                    extent: TimeRange::new_with_start_and_end(start, stop),
                    pitches,
                    tied_pitches,
                }
            })
            .collect()
    }

    /// Flattens every part into one timeline. There's one event for every
    /// pair of consecutive boundaries in the tree, holding everything that
    /// sounds then, or a rest if nothing does.
    pub fn to_chordified_score(
        &self,
        settings: &ReconstructionSettings,
    ) -> Result<Vec<ReconstructedEvent>> {
        let (tree, split_offsets) = self.prepare_for_reconstruction(settings)?;
        let Some(range) = tree.extent() else {
            return Ok(Vec::default());
        };
        let points = points_within(&range, tree.all_time_points(), &split_offsets);
        let events = tree.events_between(&points, settings.chordify_single_pitches);
        log::debug!("chordified {} timespans into {} events", tree.len(), events.len());
        Ok(events)
    }

    /// Rebuilds one timeline per part. Every timeline spans the whole tree,
    /// with rests wherever its part is silent. Parts recorded in the tree's
    /// [ScoreSource](super::ScoreSource) come first, in source order, even if
    /// they have nothing in them.
    pub fn to_partwise_score(
        &self,
        settings: &ReconstructionSettings,
    ) -> Result<Vec<ReconstructedPart>> {
        let (tree, split_offsets) = self.prepare_for_reconstruction(settings)?;
        let mut parts: Vec<Option<PartUid>> = self
            .source()
            .map(|source| source.part_uids.iter().copied().map(Some).collect())
            .unwrap_or_default();
        for part in tree.all_parts() {
            if !parts.contains(&part) {
                parts.push(part);
            }
        }
        let Some(range) = tree.extent() else {
            return Ok(parts
                .into_iter()
                .map(|part| ReconstructedPart {
                    part,
                    events: Vec::default(),
                })
                .collect());
        };

        let mut partwise = tree.to_partwise_trees()?;
        let r = parts
            .into_iter()
            .map(|part| {
                let part_tree = partwise
                    .iter()
                    .position(|(p, _)| *p == part)
                    .map(|i| partwise.swap_remove(i).1)
                    .unwrap_or_default();
                let mut points = part_tree.all_time_points();
                points.extend([range.start(), range.end()]);
                let points = points_within(&range, points, &split_offsets);
                ReconstructedPart {
                    part,
                    events: part_tree.events_between(&points, false),
                }
            })
            .collect::<Vec<_>>();
        log::debug!("rebuilt {} parts over {range}", r.len());
        Ok(r)
    }

    // From the earliest start to the latest stop.
    fn extent(&self) -> Option<TimeRange> {
        Some(TimeRange::new_with_start_and_end(
            self.earliest_start()?,
            self.latest_stop()?,
        ))
    }
}

// Merges boundary points with the split offsets that fall inside `range`, so
// that rests also break at template boundaries.
fn points_within(range: &TimeRange, points: Vec<Offset>, split_offsets: &[Offset]) -> Vec<Offset> {
    let points: BTreeSet<Offset> = points
        .into_iter()
        .chain(split_offsets.iter().copied())
        .filter(|o| *o >= range.start() && *o <= range.end())
        .collect();
    points.into_iter().collect()
}

impl<T: MusicalTimespan + Clone> TimespanTree<T> {
    /// See [OffsetTree::to_chordified_score()].
    pub fn to_chordified_score(
        &self,
        settings: &ReconstructionSettings,
    ) -> Result<Vec<ReconstructedEvent>> {
        self.tree().to_chordified_score(settings)
    }

    /// See [OffsetTree::to_partwise_score()].
    pub fn to_partwise_score(
        &self,
        settings: &ReconstructionSettings,
    ) -> Result<Vec<ReconstructedPart>> {
        self.tree().to_partwise_score(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timespans::{
        element::tests::{note_timespan, TestNote},
        ElementTimespan, ReconstructionSettingsBuilder, ScoreSource,
    };
    use strum::IntoEnumIterator;

    type Tree = OffsetTree<ElementTimespan<TestNote>>;

    fn o(value: i32) -> Offset {
        Offset::from(value)
    }

    fn pitches(values: &[u8]) -> BTreeSet<PitchId> {
        values.iter().map(|p| PitchId(*p)).collect()
    }

    fn assert_partitions(events: &[ReconstructedEvent], start: Offset, stop: Offset) {
        assert_eq!(events.first().map(|e| e.extent.start()), Some(start));
        assert_eq!(events.last().map(|e| e.extent.end()), Some(stop));
        for pair in events.windows(2) {
            assert_eq!(pair[0].extent.end(), pair[1].extent.start(), "gap or overlap");
        }
        assert!(events.iter().all(|e| e.extent.start() < e.extent.end()));
    }

    fn two_voices() -> Tree {
        Tree::new_with([
            note_timespan(0, 4, &[48], 2),
            note_timespan(0, 2, &[60], 1),
            note_timespan(3, 4, &[64], 1),
        ])
        .unwrap()
    }

    #[test]
    fn chordify_partitions_the_tree() {
        let events = two_voices()
            .to_chordified_score(&ReconstructionSettings::default())
            .unwrap();
        assert_partitions(&events, o(0), o(4));
        let summary: Vec<_> = events
            .iter()
            .map(|e| (e.kind, e.pitches.clone(), e.tied_pitches.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (EventKind::Chord, pitches(&[48, 60]), pitches(&[])),
                (EventKind::Chord, pitches(&[48]), pitches(&[48])),
                (EventKind::Chord, pitches(&[48, 64]), pitches(&[48])),
            ]
        );

        let settings = ReconstructionSettingsBuilder::default()
            .chordify_single_pitches(false)
            .build()
            .unwrap();
        let events = two_voices().to_chordified_score(&settings).unwrap();
        assert_eq!(events[1].kind, EventKind::Note);
    }

    #[test]
    fn silence_becomes_a_rest() {
        let tree = Tree::new_with([note_timespan(0, 1, &[60], 1), note_timespan(2, 3, &[62], 1)])
            .unwrap();
        let events = tree
            .to_chordified_score(&ReconstructionSettings::default())
            .unwrap();
        assert_partitions(&events, o(0), o(3));
        assert!(events[1].is_rest());
        assert!(events[1].pitches.is_empty());
    }

    #[test]
    fn template_offsets_split_and_tie() {
        let tree = Tree::new_with([note_timespan(0, 6, &[60], 1)]).unwrap();
        let settings = ReconstructionSettingsBuilder::default()
            .template_offsets(vec![o(4), o(20)])
            .build()
            .unwrap();
        let events = tree.to_chordified_score(&settings).unwrap();
        assert_partitions(&events, o(0), o(6));
        assert_eq!(events.len(), 2);
        assert!(events[0].tied_pitches.is_empty());
        assert_eq!(events[1].tied_pitches, pitches(&[60]), "second shard ties back");
        assert_eq!(tree.len(), 1, "the source tree isn't split");
    }

    #[test]
    fn source_measures_split_unless_disabled() {
        let mut tree = Tree::new_with([note_timespan(0, 8, &[60], 1)]).unwrap();
        tree.set_source(Some(ScoreSource {
            part_uids: vec![PartUid(1), PartUid(2)],
            measure_offsets: vec![o(0), o(4)],
        }));
        let events = tree
            .to_chordified_score(&ReconstructionSettings::default())
            .unwrap();
        assert_eq!(events.len(), 2);

        let settings = ReconstructionSettingsBuilder::default()
            .split_at_source_measures(false)
            .build()
            .unwrap();
        assert_eq!(tree.to_chordified_score(&settings).unwrap().len(), 1);

        let parts = tree
            .to_partwise_score(&ReconstructionSettings::default())
            .unwrap();
        assert_eq!(parts.len(), 2, "empty parts from the source are kept");
        assert_eq!(parts[1].part, Some(PartUid(2)));
        assert_partitions(&parts[1].events, o(0), o(8));
        assert!(parts[1].events.iter().all(|e| e.is_rest()));
        assert_eq!(parts[1].events.len(), 2, "rests break at measure lines");
    }

    #[test]
    fn zero_length_timespans_are_left_out_by_default() {
        let tree = Tree::new_with([note_timespan(0, 2, &[60], 1), note_timespan(1, 1, &[79], 1)])
            .unwrap();
        let events = tree
            .to_chordified_score(&ReconstructionSettings::default())
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].pitches, pitches(&[60]));

        let settings = ReconstructionSettingsBuilder::default()
            .include_zero_length(true)
            .build()
            .unwrap();
        let events = tree.to_chordified_score(&settings).unwrap();
        assert_partitions(&events, o(0), o(2));
        assert_eq!(events[1].pitches, pitches(&[60, 79]));
    }

    #[test]
    fn partwise_fills_gaps_with_rests() {
        let parts = two_voices()
            .to_partwise_score(&ReconstructionSettings::default())
            .unwrap();
        assert_eq!(parts.len(), 2);
        // Part 1's note stops first, so it's seen first.
        let soprano = &parts[0];
        assert_eq!(soprano.part, Some(PartUid(1)));
        assert_partitions(&soprano.events, o(0), o(4));
        let kinds: Vec<_> = soprano.events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Note, EventKind::Rest, EventKind::Note]);

        let bass = &parts[1];
        assert_eq!(bass.events.len(), 1);
        assert_eq!(bass.events[0].pitches, pitches(&[48]));

        assert!(Tree::new()
            .to_partwise_score(&ReconstructionSettings::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn every_event_kind_is_produced() {
        let tree = two_voices();
        let settings = ReconstructionSettingsBuilder::default()
            .chordify_single_pitches(false)
            .build()
            .unwrap();
        let mut events = tree.to_chordified_score(&settings).unwrap();
        events.extend(
            tree.to_partwise_score(&settings)
                .unwrap()
                .into_iter()
                .flat_map(|p| p.events),
        );
        for kind in EventKind::iter() {
            let name: &'static str = kind.into();
            assert!(events.iter().any(|e| e.kind == kind), "no {name} event");
            assert_eq!(serde_json::to_value(kind).unwrap(), name);
        }
    }
}
