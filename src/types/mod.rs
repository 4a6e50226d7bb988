// Copyright (c) 2024 Mike Tsao

//! Common data types used throughout the system.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{Offset, PartUid, PitchClass, PitchId, TimeRange, Uid};
}

pub use {
    pitch::{PitchClass, PitchId},
    time::{Offset, TimeRange},
    uid::{IsUid, PartUid, Uid},
};

mod pitch;
mod time;
mod uid;
