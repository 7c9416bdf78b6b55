// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use segtree_core::RawData;
use segtree_gain::likelihood::full_log_likelihoods;
use segtree_gain::{GainModel, SearchStrategy};

/// Number of refinement rounds of the coarse-to-fine search.
pub const COARSE_TO_FINE_ROUNDS: usize = 4;
/// Evenly spaced probes scored per coarse-to-fine round.
pub const COARSE_TO_FINE_PROBES: usize = 10;

/// One round of scoring over a node.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct GainResult {
    pub start: usize,
    pub stop: usize,
    /// Split indices scored in this round, ascending.
    pub candidates: Vec<usize>,
    /// Normalized gain per entry of `candidates`.
    pub gain: Vec<f64>,
    /// Argmax of this round.
    pub guess: usize,
    /// Out-of-bag class-1 probabilities of the fit at `guess`, one per row of
    /// `[start, stop)`, for classifier-based models.
    pub predictions: Option<Vec<f64>>,
    /// Per-row log-likelihoods of class 0 (`[0]`) and class 1 (`[1]`) derived
    /// from `predictions`, relative to the constant classifier.
    pub likelihoods: Option<[Vec<f64>; 2]>,
}

/// Outcome of searching one node or interval for its best split.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct OptimizerResult {
    pub start: usize,
    pub stop: usize,
    pub best_split: usize,
    pub max_gain: f64,
    /// One entry per round: one for single-pass, four for coarse-to-fine.
    pub gain_results: Vec<GainResult>,
}

/// Position of the maximum, ties resolved to the first (smallest split).
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (idx, &value) in values.iter().enumerate().skip(1) {
        if value > values[best] {
            best = idx;
        }
    }
    best
}

/// Evenly spaced positions of `lo..=hi`, plus `include`, ascending and unique.
fn probe_positions(lo: usize, hi: usize, probes: usize, include: Option<usize>) -> Vec<usize> {
    let span = hi - lo;
    let mut positions: Vec<usize> = if span < probes {
        (lo..=hi).collect()
    } else {
        (0..probes)
            .map(|j| lo + (j * span + (probes - 1) / 2) / (probes - 1))
            .collect()
    };
    positions.extend(include);
    positions.sort_unstable();
    positions.dedup();
    positions
}

/// Drives a [`GainModel`] over a candidate list.
///
/// Raw gains are divided by `normalization` (the root sample count) so every
/// reported gain sits on the scale of the split floor.
pub struct Optimizer<'a> {
    model: &'a dyn GainModel,
    normalization: f64,
}

impl<'a> Optimizer<'a> {
    pub fn new(model: &'a dyn GainModel, n: usize) -> Self {
        Self {
            model,
            normalization: n as f64,
        }
    }

    pub fn strategy(&self) -> SearchStrategy {
        self.model.search_strategy()
    }

    /// Best split of `[start, stop)` among `candidates` (ascending), or `None`
    /// when there is nothing to score.
    pub fn find_best_split(
        &self,
        data: &RawData<'_>,
        start: usize,
        stop: usize,
        candidates: &[usize],
    ) -> Option<OptimizerResult> {
        if candidates.is_empty() {
            return None;
        }
        let gain_results = match self.model.search_strategy() {
            SearchStrategy::SinglePass => vec![self.round(data, start, stop, candidates.to_vec())],
            SearchStrategy::CoarseToFine => self.coarse_to_fine(data, start, stop, candidates),
        };
        let last = gain_results.last()?;
        let guess_pos = last.candidates.iter().position(|&c| c == last.guess)?;
        Some(OptimizerResult {
            start,
            stop,
            best_split: last.guess,
            max_gain: last.gain[guess_pos],
            gain_results,
        })
    }

    fn round(
        &self,
        data: &RawData<'_>,
        start: usize,
        stop: usize,
        candidates: Vec<usize>,
    ) -> GainResult {
        let curve = self.model.score(data, start, stop, &candidates);
        let gain: Vec<f64> = curve
            .gain
            .iter()
            .map(|&raw| raw / self.normalization)
            .collect();
        let best = argmax(&gain);
        let predictions = curve
            .predictions
            .and_then(|mut per_candidate| {
                (best < per_candidate.len()).then(|| per_candidate.swap_remove(best))
            });
        let guess = candidates[best];
        let likelihoods = predictions
            .as_deref()
            .map(|probabilities| full_log_likelihoods(probabilities, guess - start));
        GainResult {
            start,
            stop,
            guess,
            candidates,
            gain,
            predictions,
            likelihoods,
        }
    }

    fn coarse_to_fine(
        &self,
        data: &RawData<'_>,
        start: usize,
        stop: usize,
        candidates: &[usize],
    ) -> Vec<GainResult> {
        let mut lo = 0;
        let mut hi = candidates.len() - 1;
        let mut guess_pos: Option<usize> = None;
        let mut rounds = Vec::with_capacity(COARSE_TO_FINE_ROUNDS);

        for round in 0..COARSE_TO_FINE_ROUNDS {
            let positions = probe_positions(lo, hi, COARSE_TO_FINE_PROBES, guess_pos);
            let probed = positions.iter().map(|&pos| candidates[pos]).collect();
            let result = self.round(data, start, stop, probed);

            let best = argmax(&result.gain);
            let pos = positions[best];
            lo = if best > 0 { positions[best - 1] } else { pos };
            hi = positions.get(best + 1).copied().unwrap_or(pos);
            guess_pos = Some(pos);

            tracing::trace!(
                start,
                stop,
                round,
                guess = result.guess,
                window_lo = candidates[lo],
                window_hi = candidates[hi],
                "coarse-to-fine round"
            );
            rounds.push(result);
        }
        rounds
    }
}
