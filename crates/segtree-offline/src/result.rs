// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::candidates::Interval;
use crate::optimizer::OptimizerResult;
use segtree_core::Diagnostics;

/// One evaluated interval: either a pool entry or a node of the tree.
///
/// Tree nodes carry `best_split`, `max_gain` and `p_value` only when a
/// permutation test actually ran; a node rejected by the gain floor keeps its
/// `optimizer_result` but reports no statistics. Pool entries report the
/// search result of their interval and are never significant.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub start: usize,
    pub stop: usize,
    pub best_split: Option<usize>,
    pub max_gain: Option<f64>,
    pub p_value: Option<f64>,
    pub is_significant: bool,
    /// Arena index of the left child.
    pub left: Option<usize>,
    /// Arena index of the right child.
    pub right: Option<usize>,
    pub optimizer_result: Option<OptimizerResult>,
}

impl Segment {
    pub fn blank(start: usize, stop: usize) -> Self {
        Self {
            start,
            stop,
            best_split: None,
            max_gain: None,
            p_value: None,
            is_significant: false,
            left: None,
            right: None,
            optimizer_result: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none()
    }

    pub fn len(&self) -> usize {
        self.stop - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.stop
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.stop)
    }
}

/// Output of one segmentation run.
///
/// `segments` is an arena: the first `pool_size` entries mirror the candidate
/// interval pool in generation order, the rest are tree nodes in preorder with
/// the root first.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentationResult {
    n: usize,
    segments: Vec<Segment>,
    pool_size: usize,
    diagnostics: Diagnostics,
}

impl SegmentationResult {
    pub(crate) fn new(
        n: usize,
        segments: Vec<Segment>,
        pool_size: usize,
        diagnostics: Diagnostics,
    ) -> Self {
        debug_assert!(segments.len() > pool_size, "a result always has a root");
        Self {
            n,
            segments,
            pool_size,
            diagnostics,
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Ascending split points of every significant tree node.
    pub fn split_points(&self) -> Vec<usize> {
        let mut splits: Vec<usize> = self
            .nodes()
            .filter(|node| node.is_significant)
            .filter_map(|node| node.best_split)
            .collect();
        splits.sort_unstable();
        splits
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn pool(&self) -> &[Segment] {
        &self.segments[..self.pool_size]
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn root_index(&self) -> usize {
        self.pool_size
    }

    pub fn root(&self) -> &Segment {
        &self.segments[self.pool_size]
    }

    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn left(&self, segment: &Segment) -> Option<&Segment> {
        segment.left.and_then(|idx| self.segments.get(idx))
    }

    pub fn right(&self, segment: &Segment) -> Option<&Segment> {
        segment.right.and_then(|idx| self.segments.get(idx))
    }

    /// Tree nodes in preorder.
    pub fn nodes(&self) -> impl Iterator<Item = &Segment> + '_ {
        self.segments[self.pool_size..].iter()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}
