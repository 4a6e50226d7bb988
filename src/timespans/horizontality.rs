// Copyright (c) 2024 Mike Tsao

use crate::prelude::*;
use delegate::delegate;
use std::{collections::BTreeSet, sync::Arc};

/// Consecutive timespans from one part, for looking at melodic shape.
#[derive(Debug)]
pub struct Horizontality<T>(Vec<Arc<T>>);
impl<T> Clone for Horizontality<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}
impl<T> Horizontality<T> {
    #[allow(missing_docs)]
    pub fn new_with(timespans: Vec<Arc<T>>) -> Self {
        Self(timespans)
    }

    delegate! {
        to self.0 {
            #[allow(missing_docs)]
            pub fn len(&self) -> usize;
            #[allow(missing_docs)]
            pub fn is_empty(&self) -> bool;
            #[allow(missing_docs)]
            pub fn iter(&self) -> core::slice::Iter<'_, Arc<T>>;
        }
    }

    #[allow(missing_docs)]
    pub fn timespans(&self) -> &[Arc<T>] {
        &self.0
    }
}
impl<T: Timespan> Horizontality<T> {
    #[allow(missing_docs)]
    pub fn start_offsets(&self) -> Vec<Offset> {
        self.0.iter().map(|t| t.start_offset()).collect()
    }
}
impl<T: MusicalTimespan> Horizontality<T> {
    // The single pitches of the first three timespans, if each has exactly one.
    fn three_single_pitches(&self) -> Option<[PitchId; 3]> {
        if self.0.len() < 3 {
            return None;
        }
        let mut r = [PitchId(0); 3];
        for (slot, timespan) in r.iter_mut().zip(self.0.iter()) {
            let pitches = timespan.pitches();
            if pitches.len() != 1 {
                return None;
            }
            *slot = *pitches.iter().next()?;
        }
        Some(r)
    }

    /// True if the first three timespans are single pitches moving by step
    /// twice in the same direction.
    pub fn has_passing_tone(&self) -> bool {
        let Some([a, b, c]) = self.three_single_pitches() else {
            return false;
        };
        let (first, second) = (a.semitones_to(&b), b.semitones_to(&c));
        a.is_step_to(&b) && b.is_step_to(&c) && first.signum() == second.signum()
    }

    /// True if the first three timespans are single pitches that step away
    /// and come back.
    pub fn has_neighbor_tone(&self) -> bool {
        let Some([a, b, c]) = self.three_single_pitches() else {
            return false;
        };
        a == c && a.is_step_to(&b)
    }

    /// True if there's at least one timespan and every timespan sounds the
    /// same pitches.
    pub fn has_no_motion(&self) -> bool {
        let mut sets = self.0.iter().map(|t| t.pitches());
        let Some(first) = sets.next() else {
            return false;
        };
        sets.all(|s: BTreeSet<PitchId>| s == first)
    }
}
