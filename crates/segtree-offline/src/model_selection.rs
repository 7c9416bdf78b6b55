// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use rand::seq::SliceRandom;
use segtree_core::{ResolvedControl, SegError, Stream, rng_for};

/// Decision for one node.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelSelectionResult {
    pub is_significant: bool,
    /// Absent when the gain floor rejected the node before any permutation ran.
    pub p_value: Option<f64>,
}

impl ModelSelectionResult {
    pub const REJECTED: Self = Self {
        is_significant: false,
        p_value: None,
    };
}

/// `(1 + #{permuted >= observed}) / (1 + P)`.
pub fn permutation_p_value(observed: f64, permuted: &[f64]) -> f64 {
    let at_least = permuted.iter().filter(|&&gain| gain >= observed).count();
    (1 + at_least) as f64 / (1 + permuted.len()) as f64
}

/// Row order of the `index`-th reshuffling of `[start, stop)`.
pub fn shuffled_rows(seed: u64, start: usize, stop: usize, index: usize) -> Vec<usize> {
    let mut rng = rng_for(seed, Stream::Permutation, start, stop, index as u64);
    let mut order: Vec<usize> = (start..stop).collect();
    order.shuffle(&mut rng);
    order
}

/// Gain floor plus permutation test.
#[derive(Clone, Copy, Debug)]
pub struct ModelSelector<'a> {
    control: &'a ResolvedControl,
}

impl<'a> ModelSelector<'a> {
    pub fn new(control: &'a ResolvedControl) -> Self {
        Self { control }
    }

    pub fn n_permutations(&self) -> usize {
        self.control.model_selection_n_permutations
    }

    pub fn passes_floor(&self, max_gain: f64) -> bool {
        max_gain > self.control.minimal_gain_to_split
    }

    /// Decides whether splitting `[start, stop)` at `best_split` is significant.
    ///
    /// `permuted_max_gain(i)` must return the node's best gain on its `i`-th
    /// reshuffling, searched exactly like the observed one. It is evaluated
    /// concurrently when `control.parallel` is set and rayon is available.
    pub fn select<F>(
        &self,
        start: usize,
        stop: usize,
        best_split: usize,
        max_gain: f64,
        permuted_max_gain: F,
    ) -> Result<ModelSelectionResult, SegError>
    where
        F: Fn(usize) -> Result<f64, SegError> + Send + Sync,
    {
        if !self.passes_floor(max_gain) {
            return Ok(ModelSelectionResult::REJECTED);
        }

        let permuted = self.permuted_gains(permuted_max_gain)?;
        let p_value = permutation_p_value(max_gain, &permuted);
        let min_len = self.control.min_segment_len;
        let long_enough = best_split - start >= min_len && stop - best_split >= min_len;

        Ok(ModelSelectionResult {
            is_significant: long_enough && p_value <= self.control.model_selection_alpha,
            p_value: Some(p_value),
        })
    }

    fn permuted_gains<F>(&self, permuted_max_gain: F) -> Result<Vec<f64>, SegError>
    where
        F: Fn(usize) -> Result<f64, SegError> + Send + Sync,
    {
        let count = self.n_permutations();
        #[cfg(feature = "rayon")]
        if self.control.parallel {
            use rayon::prelude::*;
            return (0..count).into_par_iter().map(&permuted_max_gain).collect();
        }
        (0..count).map(permuted_max_gain).collect()
    }
}
