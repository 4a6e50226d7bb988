// Copyright (c) 2024 Mike Tsao

use crate::prelude::*;
use derivative::Derivative;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Controls how [TimespanTree](super::TimespanTree) rebuilds scores from its
/// timespans.
#[derive(Builder, Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[builder(default)]
#[serde(rename_all = "kebab-case")]
pub struct ReconstructionSettings {
    /// Split at every measure start recorded when the tree was built.
    #[derivative(Default(value = "true"))]
    #[serde(default = "ReconstructionSettings::default_true")]
    pub split_at_source_measures: bool,

    /// Extra offsets to split at, typically the measure boundaries of some
    /// other score.
    #[builder(setter(strip_option))]
    #[serde(default)]
    pub template_offsets: Option<Vec<Offset>>,

    /// Keep grace notes and other timespans that take no time.
    #[serde(default)]
    pub include_zero_length: bool,

    /// When chordifying, report single pitches as one-note chords rather
    /// than notes.
    #[derivative(Default(value = "true"))]
    #[serde(default = "ReconstructionSettings::default_true")]
    pub chordify_single_pitches: bool,
}
impl ReconstructionSettings {
    fn default_true() -> bool {
        true
    }

    /// Every offset these settings say to split at, given what the tree knows
    /// about its source measures.
    pub fn split_offsets(&self, measure_offsets: Option<&[Offset]>) -> Vec<Offset> {
        let mut r: Vec<Offset> = self.template_offsets.iter().flatten().copied().collect();
        if self.split_at_source_measures {
            r.extend(measure_offsets.into_iter().flatten().copied());
        }
        r.sort();
        r.dedup();
        r
    }
}
