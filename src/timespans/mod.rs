// Copyright (c) 2024 Mike Tsao

//! Indexes timespans by offset and answers "what is sounding at time T?"
//!
//! [OffsetTree] is the index itself. Wrap it in a [TimespanTree] to get
//! [Verticality]s that can navigate back into the tree, iterators over them,
//! and score reconstruction.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        ContainerKind, ElementTimespan, ElementTimespanBuilder, EventKind, Horizontality,
        OffsetTree, ReconstructedEvent, ReconstructedPart, ReconstructionSettings,
        ReconstructionSettingsBuilder, ScoreSource, ScoreWalkEvent, TimespanTree, TreeHandle,
        Verticality, VerticalitySequence,
    };
}

pub use {
    element::{ContainerKind, ElementTimespan, ElementTimespanBuilder, Parentage, ParentageEntry},
    handle::{TimespanTree, TreeHandle},
    horizontality::Horizontality,
    indexing::{ScoreSource, ScoreWalkEvent},
    iteration::{ConsonanceBoundedIter, NwiseVerticalityIter, VerticalityIter},
    node::{NodeIter, OffsetTreeNode},
    reconstruction::{EventKind, ReconstructedEvent, ReconstructedPart},
    settings::{ReconstructionSettings, ReconstructionSettingsBuilder},
    tree::OffsetTree,
    verticality::{Verticality, VerticalitySequence},
};

pub(crate) mod element;
mod handle;
mod horizontality;
mod indexing;
mod iteration;
mod node;
mod reconstruction;
mod settings;
mod tree;
mod verticality;
