// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// `exp(-6)`: the floor that keeps `log_eta` bounded below by `-6`.
const ETA: f64 = 0.0024787521766663585;

/// `ln(eta + (1 - eta) x)`; equals `0` at `x = 1` and `-6` at `x = 0`.
#[inline]
pub fn log_eta(x: f64) -> f64 {
    (ETA + (1.0 - ETA) * x).ln()
}

/// Log-likelihood ratio of a classifier separating `[0, split)` (class 0) from
/// `[split, m)` (class 1) against the leave-one-out constant classifier.
///
/// `probabilities[i]` is the out-of-bag probability that row `i` belongs to
/// class 1. Returns `0` when either side has at most one row.
pub fn classifier_log_likelihood_ratio(probabilities: &[f64], split: usize) -> f64 {
    let m = probabilities.len();
    if split <= 1 || m.saturating_sub(split) <= 1 {
        return 0.0;
    }
    let rest = (m - 1) as f64;
    let left_scale = rest / (split - 1) as f64;
    let right_scale = rest / (m - split - 1) as f64;

    let left: f64 = probabilities[..split]
        .iter()
        .map(|&p| log_eta((1.0 - p) * left_scale))
        .sum();
    let right: f64 = probabilities[split..]
        .iter()
        .map(|&p| log_eta(p * right_scale))
        .sum();
    left + right
}

/// Per-row log-likelihoods of both classes under the fit at `split`, each
/// relative to the leave-one-out constant classifier.
///
/// Entry `[c][i]` scores row `i` as class `c`. The prior correction of a row
/// depends on the side of `split` it was labelled on, so a row's own class
/// is left out of its prior. Summing `[0]` over `[0, split)` and `[1]` over
/// `[split, m)` gives [`classifier_log_likelihood_ratio`]. All zeros when
/// either side has at most one row.
pub fn full_log_likelihoods(probabilities: &[f64], split: usize) -> [Vec<f64>; 2] {
    let m = probabilities.len();
    if split <= 1 || m.saturating_sub(split) <= 1 {
        return [vec![0.0; m], vec![0.0; m]];
    }
    let rest = (m - 1) as f64;
    let left = split as f64;
    let right = (m - split) as f64;

    let class_zero = probabilities
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let prior = if i < split { rest / (left - 1.0) } else { rest / left };
            log_eta((1.0 - p) * prior)
        })
        .collect();
    let class_one = probabilities
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let prior = if i < split { rest / right } else { rest / (right - 1.0) };
            log_eta(p * prior)
        })
        .collect();
    [class_zero, class_one]
}

/// Leave-one-out class-1 probability of every row under the constant classifier.
pub fn null_probabilities(m: usize, split: usize) -> Vec<f64> {
    let positives = (m - split) as f64;
    let rest = (m.max(2) - 1) as f64;
    (0..m)
        .map(|i| {
            let own = if i < split { 0.0 } else { 1.0 };
            (positives - own) / rest
        })
        .collect()
}
