// Copyright (c) 2024 Mike Tsao

//! Provides a random-number generator for randomized testing of timespan
//! structures.

use crate::prelude::*;
use byteorder::{BigEndian, ByteOrder};
use delegate::delegate;

/// A pseudorandom number generator (PRNG) for generating test material. Not
/// cryptographically secure, and not meant to be.
#[derive(Debug)]
pub struct Rng(oorandom::Rand64);
impl Default for Rng {
    fn default() -> Self {
        // We want to panic if this fails, because it indicates that a core OS
        // facility isn't functioning.
        Self::new_with_seed(Self::generate_seed().unwrap())
    }
}
#[allow(missing_docs)]
impl Rng {
    /// Pass the same number to [Rng::new_with_seed()] to get the same stream
    /// back again. Good for reproducing test failures.
    pub fn new_with_seed(seed: u128) -> Self {
        Self(oorandom::Rand64::new(seed))
    }

    /// Create a sufficiently high-quality random number that's suitable for
    /// [Rng].
    pub fn generate_seed() -> anyhow::Result<u128> {
        let mut bytes = [0u8; 16];

        getrandom::getrandom(&mut bytes)?;
        Ok(BigEndian::read_u128(&bytes))
    }

    delegate! {
        to self.0 {
            pub fn rand_u64(&mut self) -> u64;
            pub fn rand_float(&mut self) -> f64;
            pub fn rand_range(&mut self, range: core::ops::Range<u64>) -> u64;
        }
    }

    /// An [Offset] in `0..horizon`, on a grid of quarter units so that
    /// duplicates and shared boundaries are common.
    pub fn random_offset(&mut self, horizon: u64) -> Offset {
        let quarters = self.rand_range(0..(horizon.max(1) * 4));
        Offset::new(quarters as i64, 4)
    }

    /// A [TimeRange] that starts in `0..horizon` and lasts less than
    /// `max_duration`. Zero-length ranges happen on purpose.
    pub fn random_extent(&mut self, horizon: u64, max_duration: u64) -> TimeRange {
        let start = self.random_offset(horizon);
        let duration = self.random_offset(max_duration);
        TimeRange::new_with_start_and_duration(start, duration)
    }
}
