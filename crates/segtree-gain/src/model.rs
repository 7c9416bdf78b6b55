// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use segtree_core::RawData;

/// How an optimizer should search a gain model's candidate list.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Score every candidate once.
    #[default]
    SinglePass,
    /// Four rounds of a shrinking evenly spaced grid, for models whose
    /// per-candidate score needs a full refit.
    CoarseToFine,
}

/// Gains for a list of candidate splits of one node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GainCurve {
    /// One non-negative raw gain per candidate, in candidate order.
    pub gain: Vec<f64>,
    /// For classifier-based models: per candidate, one out-of-bag class-1
    /// probability per row of the node.
    pub predictions: Option<Vec<Vec<f64>>>,
}

impl GainCurve {
    pub fn zeros(len: usize) -> Self {
        Self {
            gain: vec![0.0; len],
            predictions: None,
        }
    }
}

/// A split-quality score for candidate splits of a node `[start, stop)`.
///
/// Gains are raw: larger means stronger evidence of a distribution change at
/// the split and zero means none. Callers normalize them against the
/// root sample count. Implementations absorb per-candidate degeneracies
/// (single-class labels, zero variance) as a zero gain.
pub trait GainModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn search_strategy(&self) -> SearchStrategy {
        SearchStrategy::SinglePass
    }

    /// Scores each `t` in `candidates`; every `t` satisfies `start < t < stop`.
    fn score(
        &self,
        data: &RawData<'_>,
        start: usize,
        stop: usize,
        candidates: &[usize],
    ) -> GainCurve;
}

impl<M: GainModel + ?Sized> GainModel for Box<M> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn search_strategy(&self) -> SearchStrategy {
        (**self).search_strategy()
    }

    fn score(
        &self,
        data: &RawData<'_>,
        start: usize,
        stop: usize,
        candidates: &[usize],
    ) -> GainCurve {
        (**self).score(data, start, stop, candidates)
    }
}
