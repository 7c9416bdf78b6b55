// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::likelihood::{classifier_log_likelihood_ratio, null_probabilities};
use crate::model::{GainCurve, GainModel, SearchStrategy};
use biosphere::{
    MaxFeatures as ForestMaxFeatures, RandomForest, RandomForestParameters as ForestParameters,
};
use ndarray::{Array1, Array2, ArrayView2};
use segtree_core::{RandomForestParameters, RawData, SegError, Stream, derive_seed};

/// Classifier-likelihood gain backed by a random forest.
///
/// For a split `t` the rows of `[start, t)` are labelled 0 and the rows of
/// `[t, stop)` labelled 1. A forest is fitted on that labelling and its
/// out-of-bag probabilities are compared with the constant classifier. A
/// forest that separates the two sides well produces a large gain.
///
/// Every candidate needs its own fit, so optimizers search this model
/// coarse-to-fine.
#[derive(Clone, Debug)]
pub struct RandomForestGain {
    parameters: RandomForestParameters,
    seed: u64,
}

impl RandomForestGain {
    pub fn new(parameters: RandomForestParameters, seed: u64) -> Result<Self, SegError> {
        parameters.validate()?;
        Ok(Self { parameters, seed })
    }

    pub fn parameters(&self) -> &RandomForestParameters {
        &self.parameters
    }

    /// Threads used for fitting the trees of one forest.
    pub fn forest_threads(&self) -> usize {
        self.parameters.n_jobs.unwrap_or(1)
    }

    /// Forest configuration for a node with `d` columns, seeded per candidate.
    fn forest_parameters(&self, d: usize, forest_seed: u64) -> ForestParameters {
        let n_jobs = self
            .parameters
            .n_jobs
            .map(|threads| i32::try_from(threads).unwrap_or(i32::MAX));
        ForestParameters::default()
            .with_n_estimators(self.parameters.n_estimators)
            .with_max_depth(self.parameters.max_depth)
            .with_max_features(ForestMaxFeatures::Value(
                self.parameters.max_features.resolve(d),
            ))
            .with_seed(forest_seed)
            .with_n_jobs(n_jobs)
    }

    /// Out-of-bag class-1 probability of every row of `x` for a forest
    /// separating rows `[0, split)` from `[split, m)`.
    ///
    /// Rows never left out of a bootstrap fall back to the leave-one-out class
    /// frequency.
    fn out_of_bag_probabilities(
        &self,
        x: &ArrayView2<'_, f64>,
        split: usize,
        forest_seed: u64,
    ) -> Result<Vec<f64>, SegError> {
        let m = x.nrows();
        if split == 0 || split >= m {
            return Err(SegError::unfittable(format!(
                "split {split} leaves a single class among {m} rows"
            )));
        }

        let labels = Array1::from_shape_fn(m, |i| if i < split { 0.0 } else { 1.0 });
        let mut forest = RandomForest::new(self.forest_parameters(x.ncols(), forest_seed));
        let oob = forest.fit_predict_oob(x, &labels.view());

        Ok(oob
            .iter()
            .zip(null_probabilities(m, split))
            .map(|(&p, null)| if p.is_finite() { p.clamp(0.0, 1.0) } else { null })
            .collect())
    }
}

/// Row-major `m x d` copy of `[start, stop)`.
fn node_matrix(data: &RawData<'_>, start: usize, stop: usize) -> Result<Array2<f64>, SegError> {
    Array2::from_shape_vec((stop - start, data.d()), data.materialize_rows(start, stop)).map_err(
        |err| SegError::invalid_input(format!("node [{start}, {stop}) has a bad shape: {err}")),
    )
}

impl GainModel for RandomForestGain {
    fn name(&self) -> &'static str {
        "random_forest"
    }

    fn search_strategy(&self) -> SearchStrategy {
        SearchStrategy::CoarseToFine
    }

    fn score(
        &self,
        data: &RawData<'_>,
        start: usize,
        stop: usize,
        candidates: &[usize],
    ) -> GainCurve {
        let m = stop - start;
        let x = match node_matrix(data, start, stop) {
            Ok(x) => x,
            Err(err) => {
                tracing::trace!(start, stop, %err, "forest gain absorbed as zero");
                return GainCurve::zeros(candidates.len());
            }
        };
        let x = x.view();

        let mut gain = Vec::with_capacity(candidates.len());
        let mut predictions = Vec::with_capacity(candidates.len());
        for &split in candidates {
            let local_split = split - start;
            let forest_seed = derive_seed(self.seed, Stream::Forest, start, stop, split as u64);
            match self.out_of_bag_probabilities(&x, local_split, forest_seed) {
                Ok(probabilities) => {
                    let ratio = classifier_log_likelihood_ratio(&probabilities, local_split);
                    gain.push(ratio.max(0.0));
                    predictions.push(probabilities);
                }
                Err(err) => {
                    tracing::trace!(start, stop, split, %err, "forest gain absorbed as zero");
                    gain.push(0.0);
                    predictions.push(null_probabilities(m, local_split.min(m)));
                }
            }
        }

        GainCurve {
            gain,
            predictions: Some(predictions),
        }
    }
}
