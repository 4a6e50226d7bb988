// Copyright (c) 2024 Mike Tsao

//! Identifiers for the external containers (scores, parts, measures) that own
//! indexed elements.

use core::hash::Hash;
use serde::{Deserialize, Serialize};
use synonym::Synonym;

/// Identifies one container in the external notation model.
#[derive(Synonym, Serialize, Deserialize, Eq, PartialEq)]
// See
// https://doc.rust-lang.org/stable/std/marker/trait.StructuralPartialEq.html
// for explanation why we derive PartialEq rather than letting Synonym do it.
#[synonym(skip(PartialEq))]
#[serde(rename_all = "kebab-case")]
pub struct Uid(pub usize);
impl IsUid for Uid {
    fn as_usize(&self) -> usize {
        self.0
    }
}

/// Identifies a part (a single performer's line). Parts are ordered by their
/// numeric value, which matters when choosing a bass among equal pitches.
#[derive(Synonym, Serialize, Deserialize, Eq, PartialEq)]
#[synonym(skip(PartialEq))]
#[serde(rename_all = "kebab-case")]
pub struct PartUid(pub usize);
impl IsUid for PartUid {
    fn as_usize(&self) -> usize {
        self.0
    }
}
impl From<Uid> for PartUid {
    fn from(value: Uid) -> Self {
        Self(value.0)
    }
}

/// Something that behaves like a numeric identifier.
pub trait IsUid: Eq + Hash + Clone + From<usize> {
    /// Returns the raw uid.
    fn as_usize(&self) -> usize;
}
