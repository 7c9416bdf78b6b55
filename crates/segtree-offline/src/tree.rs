// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::candidates::{CandidateGenerator, Interval, SegmentationType};
use crate::model_selection::{ModelSelector, shuffled_rows};
use crate::optimizer::{Optimizer, OptimizerResult};
use crate::result::Segment;
use segtree_core::{RawData, ResolvedControl, SegError};
use segtree_gain::GainModel;

/// Arena produced by [`TreeBuilder::build`]: pool entries first, then the
/// tree in preorder.
#[derive(Debug)]
pub(crate) struct GrownTree {
    pub segments: Vec<Segment>,
    pub pool_size: usize,
}

/// Owned subtree, flattened into the arena once both children are done.
struct GrownNode {
    segment: Segment,
    children: Option<Box<(GrownNode, GrownNode)>>,
}

/// `candidate` beats `current` on higher gain, then smaller split, then the
/// interval starting first.
fn pooled_result_better(candidate: &OptimizerResult, current: &OptimizerResult) -> bool {
    if candidate.max_gain != current.max_gain {
        return candidate.max_gain > current.max_gain;
    }
    if candidate.best_split != current.best_split {
        return candidate.best_split < current.best_split;
    }
    candidate.start < current.start
}

/// Grows the segmentation tree top-down.
pub(crate) struct TreeBuilder<'a> {
    data: RawData<'a>,
    control: &'a ResolvedControl,
    generator: &'a CandidateGenerator<'a>,
    optimizer: Optimizer<'a>,
    selector: ModelSelector<'a>,
    /// Search result of every pool interval, by pool index.
    pool_results: Vec<Option<OptimizerResult>>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        data: RawData<'a>,
        model: &'a dyn GainModel,
        generator: &'a CandidateGenerator<'a>,
        control: &'a ResolvedControl,
    ) -> Self {
        let optimizer = Optimizer::new(model, control.n);
        let pool_results = evaluate_pool(&data, &optimizer, generator, control.parallel);
        Self {
            data,
            control,
            generator,
            optimizer,
            selector: ModelSelector::new(control),
            pool_results,
        }
    }

    pub fn build(&self) -> Result<GrownTree, SegError> {
        let root = self.grow(0, self.control.n)?;

        let mut segments: Vec<Segment> = self
            .generator
            .pool()
            .iter()
            .zip(&self.pool_results)
            .map(|(interval, result)| pool_segment(*interval, result.clone()))
            .collect();
        let pool_size = segments.len();
        flatten(root, &mut segments);
        Ok(GrownTree {
            segments,
            pool_size,
        })
    }

    fn grow(&self, start: usize, stop: usize) -> Result<GrownNode, SegError> {
        let segment = self.evaluate(start, stop)?;
        let children = match segment.best_split {
            Some(split) if segment.is_significant => {
                let (left, right) =
                    self.join(|| self.grow(start, split), || self.grow(split, stop));
                Some(Box::new((left?, right?)))
            }
            _ => None,
        };
        Ok(GrownNode { segment, children })
    }

    fn join<A, B, RA, RB>(&self, left: A, right: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send,
    {
        #[cfg(feature = "rayon")]
        if self.control.parallel {
            return rayon::join(left, right);
        }
        (left(), right())
    }

    /// Searches `[start, stop)` and runs model selection on the best split.
    fn evaluate(&self, start: usize, stop: usize) -> Result<Segment, SegError> {
        let mut segment = Segment::blank(start, stop);
        if !self.control.can_split(start, stop) {
            tracing::debug!(start, stop, "node too short to split");
            return Ok(segment);
        }
        let Some(observed) = self.observed_best(start, stop) else {
            tracing::debug!(start, stop, "node has no admissible split");
            return Ok(segment);
        };

        let selection = self.selector.select(
            start,
            stop,
            observed.best_split,
            observed.max_gain,
            |index| self.permuted_max_gain(start, stop, index),
        )?;
        if selection.p_value.is_some() {
            segment.best_split = Some(observed.best_split);
            segment.max_gain = Some(observed.max_gain);
            segment.p_value = selection.p_value;
            segment.is_significant = selection.is_significant;
        }
        tracing::debug!(
            start,
            stop,
            best_split = observed.best_split,
            max_gain = observed.max_gain,
            p_value = ?selection.p_value,
            is_significant = selection.is_significant,
            "node evaluated"
        );
        segment.optimizer_result = Some(observed);
        Ok(segment)
    }

    fn observed_best(&self, start: usize, stop: usize) -> Option<OptimizerResult> {
        match self.generator.segmentation_type() {
            SegmentationType::Bs => {
                let candidates = self.generator.split_candidates(start, stop);
                self.optimizer
                    .find_best_split(&self.data, start, stop, &candidates)
            }
            SegmentationType::Sbs | SegmentationType::Wbs => self
                .generator
                .contained_intervals(start, stop)
                .filter_map(|(idx, _)| self.pool_results.get(idx)?.as_ref())
                .fold(None, |best: Option<&OptimizerResult>, result| match best {
                    Some(current) if !pooled_result_better(result, current) => Some(current),
                    _ => Some(result),
                })
                .cloned(),
        }
    }

    /// Best gain of `[start, stop)` after its `index`-th reshuffling, searched
    /// over the same candidates as the observed data.
    fn permuted_max_gain(&self, start: usize, stop: usize, index: usize) -> Result<f64, SegError> {
        let order = shuffled_rows(self.control.seed, start, stop, index);
        let shuffled = self.data.gather_rows(&order);
        let view = shuffled.view();

        let best = match self.generator.segmentation_type() {
            SegmentationType::Bs => {
                let local = shift(&self.generator.split_candidates(start, stop), start);
                self.optimizer
                    .find_best_split(&view, 0, stop - start, &local)
                    .map(|result| result.max_gain)
            }
            SegmentationType::Sbs | SegmentationType::Wbs => self
                .generator
                .contained_intervals(start, stop)
                .filter(|&(idx, _)| matches!(self.pool_results.get(idx), Some(Some(_))))
                .filter_map(|(_, interval)| {
                    let local = shift(
                        &self.generator.split_candidates(interval.start, interval.stop),
                        start,
                    );
                    self.optimizer
                        .find_best_split(&view, interval.start - start, interval.stop - start, &local)
                        .map(|result| result.max_gain)
                })
                .reduce(f64::max),
        };
        Ok(best.unwrap_or(0.0))
    }
}

fn shift(candidates: &[usize], offset: usize) -> Vec<usize> {
    candidates.iter().map(|&split| split - offset).collect()
}

fn evaluate_pool(
    data: &RawData<'_>,
    optimizer: &Optimizer<'_>,
    generator: &CandidateGenerator<'_>,
    parallel: bool,
) -> Vec<Option<OptimizerResult>> {
    let search = |interval: &Interval| {
        let candidates = generator.split_candidates(interval.start, interval.stop);
        optimizer.find_best_split(data, interval.start, interval.stop, &candidates)
    };
    #[cfg(feature = "rayon")]
    if parallel {
        use rayon::prelude::*;
        return generator.pool().par_iter().map(search).collect();
    }
    #[cfg(not(feature = "rayon"))]
    let _ = parallel;
    generator.pool().iter().map(search).collect()
}

fn pool_segment(interval: Interval, result: Option<OptimizerResult>) -> Segment {
    Segment {
        best_split: result.as_ref().map(|r| r.best_split),
        max_gain: result.as_ref().map(|r| r.max_gain),
        optimizer_result: result,
        ..Segment::blank(interval.start, interval.stop)
    }
}

/// Appends `node` and its descendants in preorder, returning the node's index.
fn flatten(node: GrownNode, segments: &mut Vec<Segment>) -> usize {
    let index = segments.len();
    segments.push(node.segment);
    if let Some(children) = node.children {
        let (left, right) = *children;
        let left_idx = flatten(left, segments);
        let right_idx = flatten(right, segments);
        segments[index].left = Some(left_idx);
        segments[index].right = Some(right_idx);
    }
    index
}
