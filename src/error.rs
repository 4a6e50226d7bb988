// Copyright (c) 2024 Mike Tsao

//! Errors that timespan operations can report.

use crate::types::Offset;
use thiserror::Error;

/// Everything that can go wrong while building, editing, or navigating a
/// timespan tree. Looking for something that isn't there is not an error;
/// those operations return empty results or `None`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimespanError {
    /// A timespan stops before it starts.
    #[error("timespan stops at {stop}, before it starts at {start}")]
    InvalidTimespan {
        /// Where the timespan claims to start.
        start: Offset,
        /// Where the timespan claims to stop.
        stop: Offset,
    },

    /// The source of a tree couldn't be indexed. Nothing was inserted.
    #[error("couldn't build timespan tree: {0}")]
    Construction(String),

    /// A [Verticality](crate::timespans::Verticality) or iterator outlived the
    /// tree it was computed from.
    #[error("the timespan tree behind this handle no longer exists")]
    StaleHandle,

    /// A sliding window must hold at least one verticality.
    #[error("window size must be at least 1, not {0}")]
    InvalidWindow(usize),

    /// Two timespans can't be merged into one.
    #[error("can't merge timespans: {0}")]
    CannotMerge(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, TimespanError>;
