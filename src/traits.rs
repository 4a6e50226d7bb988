// Copyright (c) 2024 Mike Tsao

//! The traits that describe what the timespan machinery needs from the
//! notation model, and what it promises back.

use crate::{error::Result, prelude::*, TimespanError};
use std::collections::BTreeSet;

/// Quick import of all important traits.
pub mod prelude {
    pub use super::{ConsonanceRule, IndexableElement, MusicalTimespan, Timespan};
}

/// Something that occupies a stretch of the timeline. This is all an
/// [OffsetTree](crate::timespans::OffsetTree) needs to index a value.
///
/// Implementers are treated as immutable. Anything that looks like mutation
/// ([Timespan::with_offsets()], [Timespan::split_at()]) produces a new value.
pub trait Timespan {
    /// Where this timespan begins.
    fn start_offset(&self) -> Offset;

    /// Where this timespan ends. Never earlier than [Timespan::start_offset()]
    /// for a well-formed timespan.
    fn stop_offset(&self) -> Offset;

    /// Returns a copy of this timespan that covers a different stretch of the
    /// timeline but is otherwise identical.
    fn with_offsets(&self, start: Offset, stop: Offset) -> Self
    where
        Self: Sized;

    /// Convenience method that returns the distance between start and stop.
    fn duration(&self) -> Offset {
        self.stop_offset() - self.start_offset()
    }

    /// The start and stop as a [TimeRange].
    fn extent(&self) -> TimeRange {
        TimeRange::new_with_start_and_end(self.start_offset(), self.stop_offset())
    }

    /// True if this timespan doesn't stop before it starts.
    fn is_well_formed(&self) -> bool {
        self.start_offset() <= self.stop_offset()
    }

    /// Like [Timespan::is_well_formed()], but reports the problem.
    fn check_well_formed(&self) -> Result<()> {
        if self.is_well_formed() {
            Ok(())
        } else {
            Err(TimespanError::InvalidTimespan {
                start: self.start_offset(),
                stop: self.stop_offset(),
            })
        }
    }

    /// Splits this timespan into two shards at `offset`. If `offset` is at or
    /// outside either boundary, the first shard is an unchanged copy and there
    /// is no second shard.
    fn split_at(&self, offset: Offset) -> (Self, Option<Self>)
    where
        Self: Sized + Clone,
    {
        let (start, stop) = (self.start_offset(), self.stop_offset());
        if offset <= start || offset >= stop {
            (self.clone(), None)
        } else {
            (
                self.with_offsets(start, offset),
                Some(self.with_offsets(offset, stop)),
            )
        }
    }
}

/// A [Timespan] that knows something about music: which pitches sound during
/// it, and which part is playing them.
pub trait MusicalTimespan: Timespan {
    /// The pitches that sound for the duration of this timespan. Empty for
    /// rests.
    fn pitches(&self) -> BTreeSet<PitchId>;

    /// The part that owns this timespan, if it's known.
    fn part(&self) -> Option<PartUid>;

    /// How strong the beat is where this timespan starts, in whatever units the
    /// notation model uses.
    fn rhythmic_strength(&self) -> f64 {
        1.0
    }

    /// The extent of the measure that contains this timespan, if known.
    fn measure_extent(&self) -> Option<TimeRange> {
        None
    }

    /// True if this timespan picks up exactly where `previous` left off and
    /// represents the same sounding event (for example, two shards of one
    /// split note). Reconstruction ties such pairs together.
    #[allow(unused_variables)]
    fn is_continuation_of(&self, previous: &Self) -> bool {
        false
    }
}

/// What a note, chord, or rest in the external notation model must provide so
/// that it can be indexed from a walk of its containers. Absolute offsets are
/// computed during the walk; the element only knows how long it lasts.
pub trait IndexableElement {
    /// How long the element sounds.
    fn duration(&self) -> Offset;

    /// The pitches the element sounds. Empty for rests.
    fn pitches(&self) -> BTreeSet<PitchId>;

    /// See [MusicalTimespan::rhythmic_strength()].
    fn rhythmic_strength(&self) -> f64 {
        1.0
    }
}

/// Decides whether a set of simultaneous pitches is consonant. The rules of
/// consonance belong to the caller; this crate only asks.
pub trait ConsonanceRule {
    /// Returns true if `pitches` sound consonant together.
    fn is_consonant(&self, pitches: &BTreeSet<PitchId>) -> bool;
}
impl<F> ConsonanceRule for F
where
    F: Fn(&BTreeSet<PitchId>) -> bool,
{
    fn is_consonant(&self, pitches: &BTreeSet<PitchId>) -> bool {
        self(pitches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Span(Offset, Offset);
    impl Timespan for Span {
        fn start_offset(&self) -> Offset {
            self.0
        }

        fn stop_offset(&self) -> Offset {
            self.1
        }

        fn with_offsets(&self, start: Offset, stop: Offset) -> Self {
            Span(start, stop)
        }
    }

    #[test]
    fn split_inside_produces_two_shards() {
        let span = Span(Offset::from(0), Offset::from(4));
        let (left, right) = span.split_at(Offset::from(1));
        assert_eq!(left, Span(Offset::from(0), Offset::from(1)));
        assert_eq!(right, Some(Span(Offset::from(1), Offset::from(4))));
    }

    #[test]
    fn split_at_or_outside_boundary_is_no_op() {
        let span = Span(Offset::from(2), Offset::from(4));
        for offset in [0, 2, 4, 7] {
            let (left, right) = span.split_at(Offset::from(offset));
            assert_eq!(left, span);
            assert!(right.is_none(), "split at {offset} should be a no-op");
        }
    }

    #[test]
    fn malformed_timespans_are_reported() {
        let span = Span(Offset::from(4), Offset::from(2));
        assert!(!span.is_well_formed());
        assert_eq!(
            span.check_well_formed(),
            Err(TimespanError::InvalidTimespan {
                start: Offset::from(4),
                stop: Offset::from(2)
            })
        );
        assert!(Span(Offset::from(3), Offset::from(3)).is_well_formed());
    }

    #[test]
    fn closures_are_consonance_rules() {
        let no_seconds = |pitches: &BTreeSet<PitchId>| {
            let v: Vec<_> = pitches.iter().collect();
            v.windows(2).all(|w| !w[0].is_step_to(w[1]))
        };
        assert!(no_seconds.is_consonant(&BTreeSet::from([PitchId(60), PitchId(64)])));
        assert!(!no_seconds.is_consonant(&BTreeSet::from([PitchId(60), PitchId(62)])));
    }
}
