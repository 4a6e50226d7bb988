// Copyright (c) 2024 Mike Tsao

//! Builds [OffsetTree]s from a depth-first walk of a notation model's
//! containers.

use super::{
    ContainerKind, ElementTimespan, ElementTimespanBuilder, OffsetTree, Parentage,
    ParentageEntry,
};
use crate::{error::Result, prelude::*, TimespanError};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, sync::Arc};

/// One step of a depth-first walk over a score. Every `Enter` must be matched
/// by an `Exit`, and every `Leaf` must sit inside at least one container.
///
/// Offsets are relative to the enclosing container, exactly as the notation
/// model stores them. Absolute offsets are worked out during indexing.
#[derive(Debug)]
pub enum ScoreWalkEvent<E> {
    /// The walk descends into a container.
    Enter {
        /// What kind of container this is.
        kind: ContainerKind,
        /// The notation model's identifier for it.
        uid: Uid,
        /// Where it starts within its parent.
        offset: Offset,
        /// How long it lasts.
        duration: Offset,
    },
    /// A note, chord, or rest inside the current container.
    Leaf {
        /// The element itself.
        element: Arc<E>,
        /// Where it starts within its container.
        offset: Offset,
    },
    /// The walk leaves the current container.
    Exit,
}

/// What an [OffsetTree] remembers about the score it was built from. Used when
/// reconstructing scores.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScoreSource {
    /// Every part in the score, in walk order, including empty ones.
    pub part_uids: Vec<PartUid>,
    /// The absolute start offsets of every measure, in order.
    pub measure_offsets: Vec<Offset>,
}

#[derive(Debug)]
struct OpenContainer {
    kind: ContainerKind,
    uid: Uid,
    offset: Offset,
    duration: Offset,
}

impl<E: IndexableElement> OffsetTree<ElementTimespan<E>> {
    /// Indexes every leaf of a container walk. The walk is checked completely
    /// before anything is inserted, so a malformed walk never yields a
    /// partially built tree.
    pub fn from_walk(walk: impl IntoIterator<Item = ScoreWalkEvent<E>>) -> Result<Self> {
        let mut stack: Vec<OpenContainer> = Vec::default();
        let mut timespans = Vec::default();
        let mut source = ScoreSource::default();
        let mut measure_offsets = BTreeSet::default();

        for event in walk {
            match event {
                ScoreWalkEvent::Enter {
                    kind,
                    uid,
                    offset,
                    duration,
                } => {
                    let base = stack.last().map_or(Offset::zero(), |c| c.offset);
                    let offset = base + offset;
                    match kind {
                        ContainerKind::Part => {
                            let part_uid = PartUid::from(uid);
                            if !source.part_uids.contains(&part_uid) {
                                source.part_uids.push(part_uid);
                            }
                        }
                        ContainerKind::Measure => {
                            measure_offsets.insert(offset);
                        }
                        _ => {}
                    }
                    stack.push(OpenContainer {
                        kind,
                        uid,
                        offset,
                        duration,
                    });
                }
                ScoreWalkEvent::Leaf { element, offset } => {
                    let Some(parent) = stack.last() else {
                        return Err(TimespanError::Construction(format!(
                            "element at offset {offset} isn't inside any container"
                        )));
                    };
                    let start = parent.offset + offset;
                    let stop = start + element.duration();
                    let parentage = Parentage(
                        stack
                            .iter()
                            .rev()
                            .map(|c| ParentageEntry {
                                kind: c.kind,
                                uid: c.uid,
                                offset: c.offset,
                            })
                            .collect(),
                    );
                    let rhythmic_strength = element.rhythmic_strength();
                    let mut builder = ElementTimespanBuilder::default()
                        .element(element)
                        .start_offset(start)
                        .stop_offset(stop)
                        .rhythmic_strength(rhythmic_strength)
                        .parentage(parentage);
                    if let Some(measure) = stack
                        .iter()
                        .rev()
                        .find(|c| c.kind == ContainerKind::Measure)
                    {
                        builder = builder.measure_extent(TimeRange::new_with_start_and_duration(
                            measure.offset,
                            measure.duration,
                        ));
                    }
                    timespans.push(builder.build()?);
                }
                ScoreWalkEvent::Exit => {
                    if stack.pop().is_none() {
                        return Err(TimespanError::Construction(
                            "walk leaves more containers than it entered".to_string(),
                        ));
                    }
                }
            }
        }
        if !stack.is_empty() {
            return Err(TimespanError::Construction(format!(
                "walk ended with {} containers still open",
                stack.len()
            )));
        }

        source.measure_offsets = measure_offsets.into_iter().collect();
        log::debug!(
            "indexed {} elements from {} parts and {} measures",
            timespans.len(),
            source.part_uids.len(),
            source.measure_offsets.len()
        );
        let mut tree = Self::new_with(timespans)?;
        tree.set_source(Some(source));
        Ok(tree)
    }
}
