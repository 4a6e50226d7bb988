// Copyright (c) 2024 Mike Tsao

use super::{OffsetTree, Verticality};
use crate::{error::Result, prelude::*, TimespanError};
use std::{
    cell::{Ref, RefCell, RefMut},
    rc::{Rc, Weak},
    sync::Arc,
};

/// Owns an [OffsetTree] and lets [Verticality]s and iterators refer back to it
/// through a [TreeHandle]. Cloning a [TimespanTree] shares the same tree.
///
/// Edits go through [TimespanTree] and are visible to every outstanding
/// handle the moment they return. Don't hold the [Ref] from
/// [TimespanTree::tree()] across an edit; that panics, as any [RefCell]
/// double borrow does.
#[derive(Debug)]
pub struct TimespanTree<T> {
    inner: Rc<RefCell<OffsetTree<T>>>,
}
impl<T> Clone for TimespanTree<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}
impl<T> Default for TimespanTree<T> {
    fn default() -> Self {
        Self::from(OffsetTree::default())
    }
}
impl<T> From<OffsetTree<T>> for TimespanTree<T> {
    fn from(tree: OffsetTree<T>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(tree)),
        }
    }
}
impl<T> TimespanTree<T> {
    /// Read access to the tree.
    pub fn tree(&self) -> Ref<'_, OffsetTree<T>> {
        self.inner.borrow()
    }

    /// Write access to the tree, for edits that [TimespanTree] doesn't wrap.
    pub fn tree_mut(&self) -> RefMut<'_, OffsetTree<T>> {
        self.inner.borrow_mut()
    }

    /// A non-owning handle to the tree.
    pub fn handle(&self) -> TreeHandle<T> {
        TreeHandle(Rc::downgrade(&self.inner))
    }
}
impl<T: Timespan> TimespanTree<T> {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// See [OffsetTree::insert()].
    pub fn insert(&self, timespan: impl Into<Arc<T>>) -> Result<()> {
        self.tree_mut().insert(timespan)
    }

    /// See [OffsetTree::insert_many()].
    pub fn insert_many<I, A>(&self, timespans: I) -> Result<()>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arc<T>>,
    {
        self.tree_mut().insert_many(timespans)
    }

    /// See [OffsetTree::remove()].
    pub fn remove(&self, timespan: &Arc<T>) -> Result<bool> {
        self.tree_mut().remove(timespan)
    }

    /// See [OffsetTree::remove_many()].
    pub fn remove_many<'a, I>(&self, timespans: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a Arc<T>>,
        T: 'a,
    {
        self.tree_mut().remove_many(timespans)
    }

    /// See [OffsetTree::split_at()].
    pub fn split_at(&self, offsets: impl IntoIterator<Item = Offset>) -> Result<()>
    where
        T: Clone,
    {
        self.tree_mut().split_at(offsets)
    }

    /// Everything that starts, stops, or sounds at `offset`.
    pub fn verticality_at(&self, offset: Offset) -> Verticality<T> {
        Verticality::new_from_tree(&self.tree(), offset, self.handle())
    }

    /// The verticality at the earliest start offset, if the tree isn't empty.
    pub fn first_verticality(&self) -> Option<Verticality<T>> {
        let offset = self.tree().earliest_start()?;
        Some(self.verticality_at(offset))
    }

    /// The verticality at the latest start offset, if the tree isn't empty.
    pub fn last_verticality(&self) -> Option<Verticality<T>> {
        let offset = self.tree().latest_start()?;
        Some(self.verticality_at(offset))
    }
}

/// A non-owning reference to a [TimespanTree]. Anything computed through a
/// handle after its tree is gone fails with [TimespanError::StaleHandle].
#[derive(Debug)]
pub struct TreeHandle<T>(Weak<RefCell<OffsetTree<T>>>);
impl<T> Clone for TreeHandle<T> {
    fn clone(&self) -> Self {
        Self(Weak::clone(&self.0))
    }
}
impl<T> TreeHandle<T> {
    /// Recovers the owning [TimespanTree].
    pub fn upgrade(&self) -> Result<TimespanTree<T>> {
        match self.0.upgrade() {
            Some(inner) => Ok(TimespanTree { inner }),
            None => {
                log::warn!("navigated a handle whose timespan tree was dropped");
                Err(TimespanError::StaleHandle)
            }
        }
    }

    /// True if the tree behind this handle no longer exists.
    pub fn is_stale(&self) -> bool {
        self.0.strong_count() == 0
    }

    /// True if both handles refer to the same tree.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.0.ptr_eq(&other.0)
    }
}
impl<T: Timespan> TreeHandle<T> {
    /// See [TimespanTree::verticality_at()].
    pub fn verticality_at(&self, offset: Offset) -> Result<Verticality<T>> {
        Ok(self.upgrade()?.verticality_at(offset))
    }
}
