// Copyright (c) 2024 Mike Tsao

//! Positions and ranges along the musical timeline.

use core::{
    fmt::{self, Display},
    ops::Range,
};
use derive_more::{Add, From, Sub};
use num_rational::Rational64;
use serde::{Deserialize, Serialize};

/// An [Offset] is an exact position along the timeline, measured in quarter
/// notes from time zero. It's rational rather than integral so that tuplets
/// land exactly where they should.
#[derive(
    Add,
    Clone,
    Copy,
    Debug,
    Eq,
    From,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    Deserialize,
    Sub,
)]
#[serde(rename_all = "kebab-case")]
pub struct Offset(pub Rational64);
impl Default for Offset {
    fn default() -> Self {
        Self::zero()
    }
}
#[allow(missing_docs)]
impl Offset {
    pub fn zero() -> Self {
        Self::from_integer(0)
    }

    pub fn from_integer(value: i64) -> Self {
        Self(Rational64::from_integer(value))
    }

    /// Creates the [Offset] `numer / denom`. Panics if `denom` is zero, just
    /// as [Rational64::new()] does.
    pub fn new(numer: i64, denom: i64) -> Self {
        Self(Rational64::new(numer, denom))
    }

    pub fn numer(&self) -> i64 {
        *self.0.numer()
    }

    pub fn denom(&self) -> i64 {
        *self.0.denom()
    }

    pub fn is_integer(&self) -> bool {
        self.0.is_integer()
    }

    /// A lossy floating-point view, for display and for external models that
    /// think in floats.
    pub fn as_f64(&self) -> f64 {
        self.numer() as f64 / self.denom() as f64
    }
}
impl From<i64> for Offset {
    fn from(value: i64) -> Self {
        Self::from_integer(value)
    }
}
impl From<i32> for Offset {
    fn from(value: i32) -> Self {
        Self::from_integer(value as i64)
    }
}
impl Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integer() {
            write!(f, "{}", self.numer())
        } else {
            write!(f, "{}/{}", self.numer(), self.denom())
        }
    }
}

/// A [TimeRange] describes a half-open range of [Offset]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TimeRange(pub Range<Offset>);
impl TimeRange {
    /// Creates a new [TimeRange] with the given absolute start and end.
    pub fn new_with_start_and_end(start: Offset, end: Offset) -> Self {
        Self(start..end)
    }

    /// Creates a new [TimeRange] with the given absolute start and (relative)
    /// duration.
    pub fn new_with_start_and_duration(start: Offset, duration: Offset) -> Self {
        Self(start..(start + duration))
    }

    /// Ensures that the extent includes the extent of the given item.
    pub fn expand_with_range(&mut self, item: &TimeRange) {
        self.0.start = self.0.start.min(item.0.start);
        self.0.end = self.0.end.max(item.0.end);
    }

    /// Ensures that the extent includes the given instant.
    pub fn expand_with_offset(&mut self, offset: Offset) {
        self.0.start = self.0.start.min(offset);
        self.0.end = self.0.end.max(offset);
    }

    /// Returns true if this TimeRange overlaps with the given one.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        // https://stackoverflow.com/a/3269471
        self.0.start < other.0.end && other.0.start < self.0.end
    }

    #[allow(missing_docs)]
    pub fn start(&self) -> Offset {
        self.0.start
    }

    #[allow(missing_docs)]
    pub fn end(&self) -> Offset {
        self.0.end
    }

    /// The distance from start to end.
    pub fn duration(&self) -> Offset {
        self.0.end - self.0.start
    }

    #[allow(missing_docs)]
    pub fn contains(&self, item: &Offset) -> bool {
        self.0.contains(item)
    }
}
impl From<Range<Offset>> for TimeRange {
    fn from(value: Range<Offset>) -> Self {
        Self(value)
    }
}
impl Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0.start, self.0.end)
    }
}
