// Copyright (c) 2024 Mike Tsao

use crate::{error::Result, prelude::*, TimespanError};
use delegate::delegate;
use derive_builder::{Builder, UninitializedFieldError};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, sync::Arc};
use strum_macros::{Display, EnumIter, IntoStaticStr};

/// The kinds of external container that can hold an indexed element.
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
pub enum ContainerKind {
    #[allow(missing_docs)]
    Score,
    #[allow(missing_docs)]
    Part,
    #[allow(missing_docs)]
    Voice,
    #[allow(missing_docs)]
    Measure,
    /// Any grouping the notation model has that we don't care about.
    Other,
}

/// One link in a [Parentage] chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParentageEntry {
    /// What kind of container this is.
    pub kind: ContainerKind,
    /// The external model's identifier for the container.
    pub uid: Uid,
    /// Where the container starts, in absolute timeline terms.
    pub offset: Offset,
}

/// The chain of containers that hold an element, innermost first and
/// outermost last.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Parentage(pub Vec<ParentageEntry>);
impl Parentage {
    delegate! {
        to self.0 {
            #[allow(missing_docs)]
            pub fn len(&self) -> usize;
            #[allow(missing_docs)]
            pub fn is_empty(&self) -> bool;
            #[allow(missing_docs)]
            pub fn iter(&self) -> core::slice::Iter<'_, ParentageEntry>;
        }
    }

    /// The innermost container of the given kind.
    pub fn innermost(&self, kind: ContainerKind) -> Option<&ParentageEntry> {
        self.0.iter().find(|entry| entry.kind == kind)
    }

    /// The part that owns this chain, if any.
    pub fn part(&self) -> Option<PartUid> {
        self.innermost(ContainerKind::Part)
            .map(|entry| PartUid::from(entry.uid))
    }
}

/// An [ElementTimespan] indexes one element of the notation model: a
/// reference to the element, where it starts and stops, and what the
/// surrounding score says about it.
///
/// [ElementTimespan]s never change. Splitting or merging produces new ones,
/// and the element itself is shared, never copied.
#[derive(Builder, Debug)]
#[builder(
    pattern = "owned",
    build_fn(validate = "Self::validate", error = "TimespanError")
)]
pub struct ElementTimespan<E> {
    /// The indexed element.
    #[builder(setter(into))]
    element: Arc<E>,

    /// Where the timespan starts.
    #[builder(setter(into))]
    start_offset: Offset,

    /// Where the timespan stops.
    #[builder(setter(into))]
    stop_offset: Offset,

    /// The bounds of the measure that contains the element.
    #[builder(default, setter(strip_option))]
    measure_extent: Option<TimeRange>,

    /// Beat strength where the element starts.
    #[builder(default = "1.0")]
    rhythmic_strength: f64,

    /// The containers that hold the element.
    #[builder(default)]
    parentage: Parentage,
}
impl<E> ElementTimespanBuilder<E> {
    fn validate(&self) -> Result<()> {
        if let (Some(start), Some(stop)) = (self.start_offset, self.stop_offset) {
            if start > stop {
                return Err(TimespanError::InvalidTimespan { start, stop });
            }
        }
        Ok(())
    }
}
impl From<UninitializedFieldError> for TimespanError {
    fn from(value: UninitializedFieldError) -> Self {
        TimespanError::Construction(value.to_string())
    }
}
impl<E> Clone for ElementTimespan<E> {
    fn clone(&self) -> Self {
        Self {
            element: Arc::clone(&self.element),
            start_offset: self.start_offset,
            stop_offset: self.stop_offset,
            measure_extent: self.measure_extent.clone(),
            rhythmic_strength: self.rhythmic_strength,
            parentage: self.parentage.clone(),
        }
    }
}
impl<E> ElementTimespan<E> {
    /// Creates an [ElementTimespan] with no surrounding context.
    pub fn new_with(element: impl Into<Arc<E>>, start: Offset, stop: Offset) -> Result<Self> {
        ElementTimespanBuilder::default()
            .element(element)
            .start_offset(start)
            .stop_offset(stop)
            .build()
    }

    /// The indexed element.
    pub fn element(&self) -> &Arc<E> {
        &self.element
    }

    /// The containers that hold the element, innermost first.
    pub fn parentage(&self) -> &Parentage {
        &self.parentage
    }

    /// True if both timespans index the very same element (not merely equal
    /// ones).
    pub fn shares_element_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.element, &other.element)
    }
}
impl<E: IndexableElement> ElementTimespan<E> {
    /// Two timespans can merge if one stops exactly where the other starts and
    /// they sound the same pitches in the same part.
    pub fn can_merge(&self, other: &Self) -> bool {
        (self.stop_offset == other.start_offset || other.stop_offset == self.start_offset)
            && self.part() == other.part()
            && self.pitches() == other.pitches()
    }

    /// Produces one timespan covering both. The earlier timespan's element and
    /// context are kept.
    pub fn merge_with(&self, other: &Self) -> Result<Self> {
        if !self.can_merge(other) {
            return Err(TimespanError::CannotMerge(format!(
                "{} and {} aren't adjacent timespans with the same pitches",
                self.extent(),
                other.extent()
            )));
        }
        Ok(if self.start_offset <= other.start_offset {
            self.with_offsets(self.start_offset, other.stop_offset)
        } else {
            other.with_offsets(other.start_offset, self.stop_offset)
        })
    }
}
impl<E> Timespan for ElementTimespan<E> {
    fn start_offset(&self) -> Offset {
        self.start_offset
    }

    fn stop_offset(&self) -> Offset {
        self.stop_offset
    }

    fn with_offsets(&self, start: Offset, stop: Offset) -> Self {
        Self {
            start_offset: start,
            stop_offset: stop,
            ..self.clone()
        }
    }
}
impl<E: IndexableElement> MusicalTimespan for ElementTimespan<E> {
    fn pitches(&self) -> BTreeSet<PitchId> {
        self.element.pitches()
    }

    fn part(&self) -> Option<PartUid> {
        self.parentage.part()
    }

    fn rhythmic_strength(&self) -> f64 {
        self.rhythmic_strength
    }

    fn measure_extent(&self) -> Option<TimeRange> {
        self.measure_extent.clone()
    }

    fn is_continuation_of(&self, previous: &Self) -> bool {
        self.shares_element_with(previous) && previous.stop_offset == self.start_offset
    }
}
