// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::model::{GainCurve, GainModel};
use segtree_core::RawData;

/// Two-sample mean-shift gain.
///
/// For a split `t` of `[start, stop)` with `s1 = t - start`, `s2 = stop - t`
/// and `m = s1 + s2` the gain is `s1 * s2 / m * ||mean_left - mean_right||^2`,
/// evaluated from per-node prefix sums in `O(m d + |candidates| d)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangeInMean;

impl ChangeInMean {
    pub const fn new() -> Self {
        Self
    }
}

/// Column prefix sums of rows `[start, stop)`, laid out `(m + 1) x d` row-major.
fn prefix_sums(data: &RawData<'_>, start: usize, stop: usize) -> Vec<f64> {
    let d = data.d();
    let m = stop - start;
    let mut prefix = vec![0.0; (m + 1) * d];
    for offset in 0..m {
        for col in 0..d {
            prefix[(offset + 1) * d + col] = prefix[offset * d + col] + data.value(start + offset, col);
        }
    }
    prefix
}

impl GainModel for ChangeInMean {
    fn name(&self) -> &'static str {
        "change_in_mean"
    }

    fn score(
        &self,
        data: &RawData<'_>,
        start: usize,
        stop: usize,
        candidates: &[usize],
    ) -> GainCurve {
        let d = data.d();
        let m = stop - start;
        let prefix = prefix_sums(data, start, stop);
        let total = &prefix[m * d..(m + 1) * d];
        let m_f = m as f64;

        let gain = candidates
            .iter()
            .map(|&split| {
                let s1 = split - start;
                if s1 == 0 || s1 >= m {
                    return 0.0;
                }
                let s1_f = s1 as f64;
                let s2_f = (m - s1) as f64;
                let left = &prefix[s1 * d..(s1 + 1) * d];
                let sum_sq: f64 = left
                    .iter()
                    .zip(total)
                    .map(|(&left_sum, &total_sum)| (m_f * left_sum - s1_f * total_sum).powi(2))
                    .sum();
                sum_sq / (m_f * s1_f * s2_f)
            })
            .collect();

        GainCurve {
            gain,
            predictions: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ChangeInMean;
    use crate::model::{GainModel, SearchStrategy};
    use segtree_core::{MemoryLayout, RawData};

    fn brute_force(rows: &[[f64; 2]], start: usize, stop: usize, split: usize) -> f64 {
        let mean = |lo: usize, hi: usize| {
            let len = (hi - lo) as f64;
            let mut acc = [0.0; 2];
            for row in &rows[lo..hi] {
                acc[0] += row[0] / len;
                acc[1] += row[1] / len;
            }
            acc
        };
        let left = mean(start, split);
        let right = mean(split, stop);
        let s1 = (split - start) as f64;
        let s2 = (stop - split) as f64;
        let diff = (left[0] - right[0]).powi(2) + (left[1] - right[1]).powi(2);
        s1 * s2 / (s1 + s2) * diff
    }

    const ROWS: [[f64; 2]; 7] = [
        [0.0, 1.0],
        [0.0, 1.0],
        [1.0, -1.0],
        [1.0, -1.0],
        [-1.0, -1.0],
        [-1.0, -1.0],
        [-1.0, -1.0],
    ];

    #[test]
    fn prefix_sum_gain_matches_mean_difference() {
        let flat: Vec<f64> = ROWS.iter().flatten().copied().collect();
        let data = RawData::from_rows(&flat, 7, 2).expect("valid data");
        let model = ChangeInMean::new();

        for (start, stop) in [(0, 7), (1, 7), (2, 6), (1, 5)] {
            let candidates: Vec<usize> = (start + 1..stop).collect();
            let curve = model.score(&data, start, stop, &candidates);
            assert_eq!(curve.gain.len(), candidates.len());
            assert!(curve.predictions.is_none());
            for (&split, &gain) in candidates.iter().zip(&curve.gain) {
                let expected = brute_force(&ROWS, start, stop, split);
                assert!(
                    (gain - expected).abs() < 1e-12,
                    "[{start}, {stop}) split {split}: got {gain}, expected {expected}"
                );
            }
        }
    }

    #[test]
    fn column_major_input_gives_identical_gains() {
        let rows: Vec<f64> = ROWS.iter().flatten().copied().collect();
        let cols: Vec<f64> = (0..2)
            .flat_map(|col| ROWS.iter().map(move |row| row[col]))
            .collect();
        let c = RawData::new(&rows, 7, 2, MemoryLayout::CContiguous).expect("c layout");
        let f = RawData::new(&cols, 7, 2, MemoryLayout::FContiguous).expect("f layout");
        let candidates: Vec<usize> = (1..7).collect();

        let model = ChangeInMean::new();
        assert_eq!(
            model.score(&c, 0, 7, &candidates),
            model.score(&f, 0, 7, &candidates)
        );
    }

    #[test]
    fn constant_data_has_zero_gain() {
        let flat = vec![3.25; 40];
        let data = RawData::from_rows(&flat, 20, 2).expect("valid data");
        let candidates: Vec<usize> = (2..18).collect();
        let curve = ChangeInMean::new().score(&data, 0, 20, &candidates);
        assert!(curve.gain.iter().all(|&gain| gain.abs() < 1e-20));
    }

    #[test]
    fn uses_single_pass_search() {
        assert_eq!(ChangeInMean::new().search_strategy(), SearchStrategy::SinglePass);
        assert_eq!(ChangeInMean::new().name(), "change_in_mean");
    }
}
