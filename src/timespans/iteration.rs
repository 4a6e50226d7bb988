// Copyright (c) 2024 Mike Tsao

//! Walks over the verticalities of a [TimespanTree]. Every step asks the live
//! tree for the neighboring start offset, so the tree may be edited between
//! steps and the walk picks up the changes. A walk ends early if its tree is
//! dropped.

use super::{Horizontality, TimespanTree, TreeHandle, Verticality, VerticalitySequence};
use crate::{error::Result, prelude::*, TimespanError};
use bounded_vec_deque::BoundedVecDeque;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Cursor {
    Start,
    At(Offset),
    Done,
}

/// Visits every start offset of a tree in order (or in reverse order).
#[derive(Debug)]
pub struct VerticalityIter<T> {
    handle: TreeHandle<T>,
    cursor: Cursor,
    reverse: bool,
}
impl<T> VerticalityIter<T> {
    fn new_with(handle: TreeHandle<T>, reverse: bool) -> Self {
        Self {
            handle,
            cursor: Cursor::Start,
            reverse,
        }
    }
}
impl<T: Timespan> Iterator for VerticalityIter<T> {
    type Item = Verticality<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == Cursor::Done {
            return None;
        }
        let Ok(tree) = self.handle.upgrade() else {
            self.cursor = Cursor::Done;
            return None;
        };
        let offset = {
            let tree = tree.tree();
            match (self.cursor, self.reverse) {
                (Cursor::Start, false) => tree.earliest_start(),
                (Cursor::Start, true) => tree.latest_start(),
                (Cursor::At(o), false) => tree.start_offset_after(o),
                (Cursor::At(o), true) => tree.start_offset_before(o),
                (Cursor::Done, _) => None,
            }
        };
        match offset {
            Some(offset) => {
                self.cursor = Cursor::At(offset);
                Some(tree.verticality_at(offset))
            }
            None => {
                self.cursor = Cursor::Done;
                None
            }
        }
    }
}

/// Slides a window of `n` consecutive verticalities across a tree. Windows
/// are always in chronological order, even when sliding backward. A walk
/// with fewer than `n` verticalities yields nothing.
#[derive(Debug)]
pub struct NwiseVerticalityIter<T> {
    verticalities: VerticalityIter<T>,
    window: BoundedVecDeque<Verticality<T>>,
}
impl<T: Timespan> Iterator for NwiseVerticalityIter<T> {
    type Item = VerticalitySequence<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let verticality = self.verticalities.next()?;
            self.window.push_back(verticality);
            if self.window.len() == self.window.max_len() {
                let mut window: Vec<_> = self.window.iter().cloned().collect();
                if self.verticalities.reverse {
                    window.reverse();
                }
                return Some(window.into());
            }
        }
    }
}

/// Groups verticalities into runs that start and end on consonant ones, with
/// at least one verticality in between. Verticalities before the first
/// consonant one are skipped.
#[derive(Debug)]
pub struct ConsonanceBoundedIter<T, R> {
    verticalities: VerticalityIter<T>,
    rule: R,
    run: Vec<Verticality<T>>,
}
impl<T: MusicalTimespan, R: ConsonanceRule> Iterator for ConsonanceBoundedIter<T, R> {
    type Item = VerticalitySequence<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.run.is_empty() {
            let opening = self
                .verticalities
                .by_ref()
                .find(|v| v.is_consonant(&self.rule))?;
            self.run.push(opening);
        }
        for verticality in self.verticalities.by_ref() {
            if verticality.is_consonant(&self.rule) {
                let mut run = std::mem::replace(&mut self.run, vec![verticality.clone()]);
                run.push(verticality);
                if run.len() > 2 {
                    return Some(run.into());
                }
            } else {
                self.run.push(verticality);
            }
        }
        None
    }
}

impl<T: Timespan> TimespanTree<T> {
    /// Every verticality at a start offset, first to last or last to first.
    pub fn iterate_verticalities(&self, reverse: bool) -> VerticalityIter<T> {
        VerticalityIter::new_with(self.handle(), reverse)
    }

    /// Every window of `n` consecutive verticalities.
    pub fn iterate_verticalities_nwise(
        &self,
        n: usize,
        reverse: bool,
    ) -> Result<NwiseVerticalityIter<T>> {
        if n == 0 {
            return Err(TimespanError::InvalidWindow(n));
        }
        Ok(NwiseVerticalityIter {
            verticalities: self.iterate_verticalities(reverse),
            window: BoundedVecDeque::new(n),
        })
    }
}
impl<T: MusicalTimespan> TimespanTree<T> {
    /// Runs of verticalities bounded by consonant ones, as judged by `rule`.
    pub fn iterate_consonance_bounded_verticalities<R: ConsonanceRule>(
        &self,
        rule: R,
    ) -> ConsonanceBoundedIter<T, R> {
        ConsonanceBoundedIter {
            verticalities: self.iterate_verticalities(false),
            rule,
            run: Vec::default(),
        }
    }

    /// See [VerticalitySequence::unwrap()].
    pub fn unwrap_verticalities(
        &self,
        verticalities: &VerticalitySequence<T>,
    ) -> Vec<(Option<PartUid>, Horizontality<T>)> {
        verticalities.unwrap()
    }
}
