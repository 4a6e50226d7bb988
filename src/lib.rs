// Copyright (c) 2024 Mike Tsao

#![deny(missing_docs, unused_imports, unused_variables)]
#![allow(rustdoc::private_intra_doc_links)]

//! Ensnare Timespans indexes the notes of many simultaneous musical lines so
//! that analysis code can ask what is sounding at any point in time.
//!
//! * *Lowest level*: Implement [Timespan](traits::Timespan) for your own type
//! and index it with an [OffsetTree](timespans::OffsetTree). Query what starts,
//! stops, or overlaps any offset.
//! * *Usual starting point*: Describe your score as a walk of
//! [ScoreWalkEvent](timespans::ScoreWalkEvent)s, build an
//! [OffsetTree](timespans::OffsetTree) with
//! [OffsetTree::from_walk()](timespans::OffsetTree::from_walk), and wrap it in
//! a [TimespanTree](timespans::TimespanTree). From there, step through
//! [Verticality](timespans::Verticality)s, look for passing and neighbor
//! tones, or rebuild the score as chords or as separate parts.

/// A collection of imports that are useful to users of this crate. `use
/// ensnare_timespans::prelude::*;` for easier onboarding.
pub mod prelude {
    pub use super::{
        timespans::prelude::*, traits::prelude::*, types::prelude::*, util::prelude::*,
        TimespanError,
    };
}

pub use error::{Result, TimespanError};

pub mod error;
pub mod timespans;
pub mod traits;
pub mod types;
pub mod util;
