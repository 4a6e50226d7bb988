// Copyright (c) 2024 Mike Tsao

//! Pitch identities, as far as the timespan machinery needs to know them.

use serde::{Deserialize, Serialize};
use synonym::Synonym;

/// Identifies a sounding pitch. The value is a MIDI key number (60 is middle
/// C), which is enough to order pitches and to measure steps between them.
/// Spelling (C# vs. Db) belongs to the notation model, not here.
#[derive(Synonym, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PitchId(pub u8);
impl PitchId {
    /// The octave-independent [PitchClass] of this pitch.
    pub fn pitch_class(&self) -> PitchClass {
        PitchClass(self.0 % 12)
    }

    /// Signed distance in semitones from `self` to `other`.
    pub fn semitones_to(&self, other: &PitchId) -> i16 {
        other.0 as i16 - self.0 as i16
    }

    /// True if `other` is a step (one or two semitones) above or below.
    pub fn is_step_to(&self, other: &PitchId) -> bool {
        matches!(self.semitones_to(other).abs(), 1 | 2)
    }
}

/// A pitch without its octave. 0 is C, 11 is B.
#[derive(Synonym, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PitchClass(pub u8);
