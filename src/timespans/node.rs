// Copyright (c) 2024 Mike Tsao

use crate::prelude::*;
use anyhow::anyhow;
use core::cmp::Ordering;
use std::sync::Arc;

/// One node of an [OffsetTree](super::OffsetTree). A node is keyed by a start
/// offset and holds every timespan that starts there, sorted by stop offset.
///
/// Besides the usual AVL bookkeeping, each node caches the earliest and latest
/// stop offsets found anywhere in its subtree. Those two values are what let
/// stop and overlap queries skip whole subtrees.
#[derive(Debug)]
pub struct OffsetTreeNode<T> {
    start_offset: Offset,
    payload: Vec<Arc<T>>,
    left: Option<Box<Self>>,
    right: Option<Box<Self>>,
    height: i32,
    balance: i32,
    earliest_stop_offset: Offset,
    latest_stop_offset: Offset,
}
impl<T> Clone for OffsetTreeNode<T> {
    fn clone(&self) -> Self {
        Self {
            start_offset: self.start_offset,
            payload: self.payload.clone(),
            left: self.left.clone(),
            right: self.right.clone(),
            height: self.height,
            balance: self.balance,
            earliest_stop_offset: self.earliest_stop_offset,
            latest_stop_offset: self.latest_stop_offset,
        }
    }
}
#[allow(missing_docs)]
impl<T> OffsetTreeNode<T> {
    /// The key of this node.
    pub fn start_offset(&self) -> Offset {
        self.start_offset
    }

    /// Every timespan starting at [OffsetTreeNode::start_offset()], ordered by
    /// stop offset.
    pub fn payload(&self) -> &[Arc<T>] {
        &self.payload
    }

    pub fn left(&self) -> Option<&Self> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&Self> {
        self.right.as_deref()
    }

    /// A leaf has height 1.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Right subtree height minus left subtree height.
    pub fn balance_factor(&self) -> i32 {
        self.balance
    }

    /// The smallest stop offset in this node's subtree, this node included.
    pub fn earliest_stop_offset(&self) -> Offset {
        self.earliest_stop_offset
    }

    /// The largest stop offset in this node's subtree, this node included.
    pub fn latest_stop_offset(&self) -> Offset {
        self.latest_stop_offset
    }

    fn child_height(child: &Option<Box<Self>>) -> i32 {
        child.as_ref().map_or(0, |c| c.height)
    }

    fn update_height(&mut self) {
        let (l, r) = (Self::child_height(&self.left), Self::child_height(&self.right));
        self.height = 1 + l.max(r);
        self.balance = r - l;
    }

    fn rotate_left(mut node: Box<Self>) -> Box<Self> {
        let Some(mut pivot) = node.right.take() else {
            return node;
        };
        node.right = pivot.left.take();
        node.update_height();
        pivot.left = Some(node);
        pivot.update_height();
        pivot
    }

    fn rotate_right(mut node: Box<Self>) -> Box<Self> {
        let Some(mut pivot) = node.left.take() else {
            return node;
        };
        node.left = pivot.right.take();
        node.update_height();
        pivot.right = Some(node);
        pivot.update_height();
        pivot
    }

    /// Restores the AVL property at this node, assuming both subtrees already
    /// have it. Aggregate stop offsets are left alone; see
    /// [OffsetTreeNode::update_aggregates()].
    fn rebalance(mut node: Box<Self>) -> Box<Self> {
        node.update_height();
        if node.balance > 1 {
            if let Some(right) = node.right.take() {
                node.right = Some(if right.balance < 0 {
                    Self::rotate_right(right)
                } else {
                    right
                });
            }
            node = Self::rotate_left(node);
        } else if node.balance < -1 {
            if let Some(left) = node.left.take() {
                node.left = Some(if left.balance > 0 {
                    Self::rotate_left(left)
                } else {
                    left
                });
            }
            node = Self::rotate_right(node);
        }
        node
    }

    fn leftmost_mut(&mut self) -> &mut Self {
        match self.left {
            Some(ref mut left) => left.leftmost_mut(),
            None => self,
        }
    }

    /// The node with the smallest key in this subtree.
    pub fn leftmost(&self) -> &Self {
        let mut node = self;
        while let Some(left) = node.left.as_deref() {
            node = left;
        }
        node
    }

    /// The node with the largest key in this subtree.
    pub fn rightmost(&self) -> &Self {
        let mut node = self;
        while let Some(right) = node.right.as_deref() {
            node = right;
        }
        node
    }

    /// Removes the node keyed by `start_offset` from the subtree rooted at
    /// `node`, returning the new root. A node with two children takes over its
    /// in-order successor's key and payload, and the successor is then removed
    /// from the right subtree.
    pub(crate) fn remove(node: Option<Box<Self>>, start_offset: Offset) -> Option<Box<Self>> {
        let mut node = node?;
        match start_offset.cmp(&node.start_offset) {
            Ordering::Less => node.left = Self::remove(node.left.take(), start_offset),
            Ordering::Greater => node.right = Self::remove(node.right.take(), start_offset),
            Ordering::Equal => match (node.left.take(), node.right.take()) {
                (None, None) => return None,
                (Some(child), None) | (None, Some(child)) => return Some(child),
                (Some(left), Some(mut right)) => {
                    let successor = right.leftmost_mut();
                    node.start_offset = successor.start_offset;
                    node.payload = std::mem::take(&mut successor.payload);
                    node.left = Some(left);
                    node.right = Self::remove(Some(right), node.start_offset);
                }
            },
        }
        Some(Self::rebalance(node))
    }

    /// Finds the node keyed exactly by `offset`.
    pub fn find(&self, offset: Offset) -> Option<&Self> {
        let mut node = Some(self);
        while let Some(n) = node {
            node = match offset.cmp(&n.start_offset) {
                Ordering::Less => n.left.as_deref(),
                Ordering::Greater => n.right.as_deref(),
                Ordering::Equal => return Some(n),
            };
        }
        None
    }

    pub(crate) fn find_mut(&mut self, offset: Offset) -> Option<&mut Self> {
        match offset.cmp(&self.start_offset) {
            Ordering::Less => self.left.as_deref_mut()?.find_mut(offset),
            Ordering::Greater => self.right.as_deref_mut()?.find_mut(offset),
            Ordering::Equal => Some(self),
        }
    }

    /// The smallest key strictly greater than `offset`.
    pub fn start_offset_after(&self, offset: Offset) -> Option<Offset> {
        let mut best = None;
        let mut node = Some(self);
        while let Some(n) = node {
            if n.start_offset > offset {
                best = Some(n.start_offset);
                node = n.left.as_deref();
            } else {
                node = n.right.as_deref();
            }
        }
        best
    }

    /// The largest key strictly less than `offset`.
    pub fn start_offset_before(&self, offset: Offset) -> Option<Offset> {
        let mut best = None;
        let mut node = Some(self);
        while let Some(n) = node {
            if n.start_offset < offset {
                best = Some(n.start_offset);
                node = n.right.as_deref();
            } else {
                node = n.left.as_deref();
            }
        }
        best
    }

    /// Visits nodes in key order.
    pub fn iter(&self) -> NodeIter<'_, T> {
        let mut iter = NodeIter { stack: Vec::new() };
        iter.push_left_spine(Some(self));
        iter
    }
}
impl<T: Timespan> OffsetTreeNode<T> {
    fn new(timespan: Arc<T>) -> Self {
        let stop = timespan.stop_offset();
        Self {
            start_offset: timespan.start_offset(),
            payload: vec![timespan],
            left: None,
            right: None,
            height: 1,
            balance: 0,
            earliest_stop_offset: stop,
            latest_stop_offset: stop,
        }
    }

    /// Restores payload order after an edit. Every payload mutation must end
    /// here.
    fn sort_payload(&mut self) {
        self.payload.sort_by_key(|t| t.stop_offset());
    }

    /// Adds `timespan` to the subtree rooted at `node`, creating a node for its
    /// start offset if there isn't one yet, and returns the new root.
    pub(crate) fn insert(node: Option<Box<Self>>, timespan: Arc<T>) -> Box<Self> {
        let Some(mut node) = node else {
            log::trace!("new node at {}", timespan.start_offset());
            return Box::new(Self::new(timespan));
        };
        match timespan.start_offset().cmp(&node.start_offset) {
            Ordering::Less => node.left = Some(Self::insert(node.left.take(), timespan)),
            Ordering::Greater => node.right = Some(Self::insert(node.right.take(), timespan)),
            Ordering::Equal => {
                node.payload.push(timespan);
                node.sort_payload();
                return node;
            }
        }
        Self::rebalance(node)
    }

    /// Removes `timespan` (by identity) from this node's payload. Returns true
    /// if it was there.
    pub(crate) fn remove_from_payload(&mut self, timespan: &Arc<T>) -> bool {
        if let Some(index) = self.payload.iter().position(|t| Arc::ptr_eq(t, timespan)) {
            // Vec::remove() keeps the remaining entries in order.
            self.payload.remove(index);
            true
        } else {
            false
        }
    }

    pub(crate) fn is_payload_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Recomputes the aggregate stop offsets of every node in this subtree,
    /// bottom up.
    pub(crate) fn update_aggregates(&mut self) {
        let (mut earliest, mut latest) = match (self.payload.first(), self.payload.last()) {
            (Some(first), Some(last)) => (first.stop_offset(), last.stop_offset()),
            _ => (self.start_offset, self.start_offset),
        };
        for child in [self.left.as_deref_mut(), self.right.as_deref_mut()]
            .into_iter()
            .flatten()
        {
            child.update_aggregates();
            earliest = earliest.min(child.earliest_stop_offset);
            latest = latest.max(child.latest_stop_offset);
        }
        self.earliest_stop_offset = earliest;
        self.latest_stop_offset = latest;
    }

    /// Appends, in key order, every timespan in this subtree that stops at
    /// `offset`.
    pub(crate) fn collect_stopping_at(&self, offset: Offset, results: &mut Vec<Arc<T>>) {
        if offset < self.earliest_stop_offset || self.latest_stop_offset < offset {
            return;
        }
        if let Some(left) = self.left.as_deref() {
            left.collect_stopping_at(offset, results);
        }
        results.extend(
            self.payload
                .iter()
                .filter(|t| t.stop_offset() == offset)
                .cloned(),
        );
        if let Some(right) = self.right.as_deref() {
            right.collect_stopping_at(offset, results);
        }
    }

    /// Appends, in key order, every timespan in this subtree that starts
    /// before `offset` and stops after it.
    pub(crate) fn collect_overlapping(&self, offset: Offset, results: &mut Vec<Arc<T>>) {
        if self.start_offset < offset && offset < self.latest_stop_offset {
            if let Some(left) = self.left.as_deref() {
                left.collect_overlapping(offset, results);
            }
            results.extend(
                self.payload
                    .iter()
                    .filter(|t| offset < t.stop_offset())
                    .cloned(),
            );
            if let Some(right) = self.right.as_deref() {
                right.collect_overlapping(offset, results);
            }
        } else if offset <= self.start_offset {
            if let Some(left) = self.left.as_deref() {
                left.collect_overlapping(offset, results);
            }
        }
    }

    /// Checks every structural invariant of this subtree. Returns its height
    /// and its true (earliest, latest) stop offsets.
    pub(crate) fn validate(
        &self,
        lower: Option<Offset>,
        upper: Option<Offset>,
    ) -> anyhow::Result<(i32, Offset, Offset)> {
        let key = self.start_offset;
        if lower.is_some_and(|lower| key <= lower) || upper.is_some_and(|upper| key >= upper) {
            return Err(anyhow!("node {key} is out of search-tree order"));
        }
        if self.payload.is_empty() {
            return Err(anyhow!("node {key} has an empty payload"));
        }
        if let Some(t) = self.payload.iter().find(|t| t.start_offset() != key) {
            return Err(anyhow!(
                "node {key} holds a timespan starting at {}",
                t.start_offset()
            ));
        }
        if self
            .payload
            .windows(2)
            .any(|w| w[0].stop_offset() > w[1].stop_offset())
        {
            return Err(anyhow!("node {key} payload isn't sorted by stop offset"));
        }

        let mut earliest = self.payload[0].stop_offset();
        let mut latest = self.payload[self.payload.len() - 1].stop_offset();
        let (mut left_height, mut right_height) = (0, 0);
        if let Some(left) = self.left.as_deref() {
            let (h, e, l) = left.validate(lower, Some(key))?;
            left_height = h;
            earliest = earliest.min(e);
            latest = latest.max(l);
        }
        if let Some(right) = self.right.as_deref() {
            let (h, e, l) = right.validate(Some(key), upper)?;
            right_height = h;
            earliest = earliest.min(e);
            latest = latest.max(l);
        }

        let height = 1 + left_height.max(right_height);
        if height != self.height {
            return Err(anyhow!(
                "node {key} records height {} but is {height} tall",
                self.height
            ));
        }
        if right_height - left_height != self.balance {
            return Err(anyhow!("node {key} has a stale balance factor"));
        }
        if self.balance.abs() > 1 {
            return Err(anyhow!(
                "node {key} is out of balance ({})",
                self.balance
            ));
        }
        if earliest != self.earliest_stop_offset || latest != self.latest_stop_offset {
            return Err(anyhow!(
                "node {key} caches stops ({}, {}) but its subtree spans ({earliest}, {latest})",
                self.earliest_stop_offset,
                self.latest_stop_offset
            ));
        }
        Ok((height, earliest, latest))
    }
}

/// In-order traversal over the nodes of a subtree. Holds one stack entry per
/// level, so memory is bounded by the tree height.
#[derive(Debug)]
pub struct NodeIter<'a, T> {
    stack: Vec<&'a OffsetTreeNode<T>>,
}
impl<'a, T> NodeIter<'a, T> {
    fn push_left_spine(&mut self, mut node: Option<&'a OffsetTreeNode<T>>) {
        while let Some(n) = node {
            self.stack.push(n);
            node = n.left.as_deref();
        }
    }
}
impl<'a, T> Iterator for NodeIter<'a, T> {
    type Item = &'a OffsetTreeNode<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left_spine(node.right.as_deref());
        Some(node)
    }
}
