// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Fixtures shared by the segtree benchmarks.

/// Row-major `n x d` series with a mean shift at every entry of `breaks`.
///
/// A cheap deterministic ripple stands in for noise so runs are comparable.
pub fn piecewise_constant(n: usize, d: usize, breaks: &[usize]) -> Vec<f64> {
    let mut values = Vec::with_capacity(n * d);
    for row in 0..n {
        let level = breaks.iter().filter(|&&b| row >= b).count() as f64;
        for col in 0..d {
            let ripple = ((row * 31 + col * 17) % 13) as f64 / 13.0 - 0.5;
            values.push(level * 2.0 + ripple);
        }
    }
    values
}

/// Evenly spaced change points splitting `n` rows into `segments` blocks.
pub fn even_breaks(n: usize, segments: usize) -> Vec<usize> {
    (1..segments).map(|k| k * n / segments).collect()
}
