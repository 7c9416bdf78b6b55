// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::model::{GainCurve, GainModel};
use segtree_core::{RawData, SegError};
use std::cmp::Ordering;

const ZERO_VARIANCE_TOL: f64 = 1e-10;

/// Edge-count gain over a k-nearest-neighbour graph.
///
/// The node's rows are standardized per column and joined into an undirected
/// kNN graph. For a split `t`, few edges crossing between `[start, t)` and
/// `[t, stop)` mean the two sides occupy different regions of feature space.
/// The gain is the squared standardized deficit of crossing edges relative to
/// a uniformly random labelling with the same group sizes, clamped at zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Knn;

impl Knn {
    pub const fn new() -> Self {
        Self
    }
}

/// `floor(sqrt(m))` neighbours for a node of `m` rows, at least one.
fn neighbours_for(m: usize) -> usize {
    ((m as f64).sqrt().floor() as usize).clamp(1, m - 1)
}

/// Row-major `m x d'` standardized copy of the node, dropping constant columns.
fn standardize(
    data: &RawData<'_>,
    start: usize,
    stop: usize,
) -> Result<(Vec<f64>, usize), SegError> {
    let m = stop - start;
    let m_f = m as f64;
    let mut columns = Vec::with_capacity(data.d());
    for col in 0..data.d() {
        let mean = (start..stop).map(|row| data.value(row, col)).sum::<f64>() / m_f;
        let variance = (start..stop)
            .map(|row| (data.value(row, col) - mean).powi(2))
            .sum::<f64>()
            / m_f;
        let sd = variance.sqrt();
        if sd > ZERO_VARIANCE_TOL * mean.abs().max(1.0) {
            columns.push((col, mean, sd));
        }
    }

    if columns.is_empty() {
        return Err(SegError::numeric_degenerate(format!(
            "every column is constant on [{start}, {stop})"
        )));
    }

    let width = columns.len();
    let mut rows = Vec::with_capacity(m * width);
    for row in start..stop {
        for &(col, mean, sd) in &columns {
            rows.push((data.value(row, col) - mean) / sd);
        }
    }
    Ok((rows, width))
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Undirected kNN edges `(i, j)` with `i < j`, sorted and deduplicated.
///
/// Distance ties go to the row closest in time, then to the smaller index, so
/// runs of identical rows link to their temporal neighbours.
fn neighbour_edges(rows: &[f64], width: usize, m: usize, k: usize) -> Vec<(usize, usize)> {
    let mut edges = Vec::with_capacity(m * k);
    let mut scratch: Vec<(f64, usize, usize)> = Vec::with_capacity(m);
    for i in 0..m {
        let anchor = &rows[i * width..(i + 1) * width];
        scratch.clear();
        scratch.extend(
            (0..m)
                .filter(|&j| j != i)
                .map(|j| {
                    let distance = squared_distance(anchor, &rows[j * width..(j + 1) * width]);
                    (distance, i.abs_diff(j), j)
                }),
        );
        let by_distance = |a: &(f64, usize, usize), b: &(f64, usize, usize)| {
            a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2))
        };
        if k < scratch.len() {
            scratch.select_nth_unstable_by(k - 1, by_distance);
        }
        for &(_, _, j) in &scratch[..k] {
            edges.push((i.min(j), i.max(j)));
        }
    }
    edges.sort_unstable();
    edges.dedup();
    edges
}

/// Moments of the crossing-edge count under uniformly random labelling.
#[derive(Clone, Copy, Debug)]
struct EdgeCountNull {
    edges: f64,
    /// Ordered pairs of distinct edges sharing a node: `sum_i deg_i (deg_i - 1)`.
    adjacent_pairs: f64,
    total: f64,
}

impl EdgeCountNull {
    /// `(E[R], Var[R])` for group sizes `(n1, n2)`.
    fn moments(&self, n1: f64, n2: f64) -> (f64, f64) {
        let n = self.total;
        let pairs = n * (n - 1.0);
        let p1 = 2.0 * n1 * n2 / pairs;
        let p2 = n1 * n2 / pairs;
        let p3 = 4.0 * n1 * n2 * (n1 - 1.0) * (n2 - 1.0) / (pairs * (n - 2.0) * (n - 3.0));
        let g = self.edges;
        let disjoint_pairs = g * (g - 1.0) - self.adjacent_pairs;
        let mean = g * p1;
        let second_moment = g * p1 + self.adjacent_pairs * p2 + disjoint_pairs * p3;
        (mean, second_moment - mean * mean)
    }
}

impl GainModel for Knn {
    fn name(&self) -> &'static str {
        "knn"
    }

    fn score(
        &self,
        data: &RawData<'_>,
        start: usize,
        stop: usize,
        candidates: &[usize],
    ) -> GainCurve {
        let m = stop - start;
        if m < 4 {
            return GainCurve::zeros(candidates.len());
        }

        let (rows, width) = match standardize(data, start, stop) {
            Ok(standardized) => standardized,
            Err(err) => {
                tracing::trace!(start, stop, %err, "knn gain absorbed as zero");
                return GainCurve::zeros(candidates.len());
            }
        };

        let k = neighbours_for(m);
        let edges = neighbour_edges(&rows, width, m, k);

        let mut degree = vec![0_usize; m];
        // crossing[s] - crossing[s-1] accumulates edges entering / leaving the cut.
        let mut crossing_delta = vec![0_i64; m + 1];
        for &(i, j) in &edges {
            degree[i] += 1;
            degree[j] += 1;
            crossing_delta[i + 1] += 1;
            crossing_delta[j + 1] -= 1;
        }
        let mut crossing = vec![0_i64; m + 1];
        let mut running = 0_i64;
        for (s, delta) in crossing_delta.iter().enumerate() {
            running += delta;
            crossing[s] = running;
        }

        let null = EdgeCountNull {
            edges: edges.len() as f64,
            adjacent_pairs: degree.iter().map(|&deg| (deg * deg.saturating_sub(1)) as f64).sum(),
            total: m as f64,
        };

        let gain = candidates
            .iter()
            .map(|&split| {
                let s1 = split - start;
                if s1 == 0 || s1 >= m {
                    return 0.0;
                }
                let (mean, variance) = null.moments(s1 as f64, (m - s1) as f64);
                if variance.partial_cmp(&0.0) != Some(Ordering::Greater) {
                    return 0.0;
                }
                let deficit = mean - crossing[s1] as f64;
                if deficit <= 0.0 {
                    return 0.0;
                }
                deficit * deficit / variance
            })
            .collect();

        GainCurve {
            gain,
            predictions: None,
        }
    }
}
