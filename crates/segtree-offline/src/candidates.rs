// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use rand::Rng;
use segtree_core::{ResolvedControl, SegError, Stream, rng_for};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Guards `ceil` against representation error such as `1 / 0.5^2 = 4.000000000000001`.
const CEIL_TOL: f64 = 1e-9;

/// Candidate strategy of the segmentation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SegmentationType {
    /// Binary segmentation: every admissible index of the node.
    #[default]
    Bs,
    /// Seeded binary segmentation over a deterministic multiscale interval family.
    Sbs,
    /// Wild binary segmentation over randomly drawn intervals.
    Wbs,
}

impl SegmentationType {
    pub const ALL: [Self; 3] = [Self::Bs, Self::Sbs, Self::Wbs];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bs => "bs",
            Self::Sbs => "sbs",
            Self::Wbs => "wbs",
        }
    }

    /// Whether candidates come from an interval pool built once per run.
    pub fn uses_pool(&self) -> bool {
        !matches!(self, Self::Bs)
    }
}

impl fmt::Display for SegmentationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentationType {
    type Err = SegError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| {
                SegError::invalid_input(format!(
                    "unknown segmentation type {value:?}; expected one of bs, sbs, wbs"
                ))
            })
    }
}

/// Half-open row range `[start, stop)`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    pub start: usize,
    pub stop: usize,
}

impl Interval {
    pub const fn new(start: usize, stop: usize) -> Self {
        Self { start, stop }
    }

    pub const fn len(&self) -> usize {
        self.stop - self.start
    }

    pub const fn is_empty(&self) -> bool {
        self.stop <= self.start
    }

    pub const fn contains(&self, other: Interval) -> bool {
        self.start <= other.start && other.stop <= self.stop
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.stop)
    }
}

fn ceil_tol(value: f64) -> f64 {
    (value - CEIL_TOL).ceil()
}

/// Seeded multiscale intervals over `[0, n)`.
///
/// Starts with the whole range. Scale `k` has intervals of length
/// `n * alpha^k`, `2 * ceil(alpha^-k) - 1` of them with evenly spaced starts,
/// so neighbours overlap. Stops at the first scale shorter than `min_len`.
pub fn seeded_intervals(n: usize, alpha: f64, min_len: usize) -> Vec<Interval> {
    let mut seen = BTreeSet::new();
    let mut intervals = Vec::new();
    let mut push = |interval: Interval| {
        if seen.insert(interval) {
            intervals.push(interval);
        }
    };
    push(Interval::new(0, n));

    let n_f = n as f64;
    let mut alpha_k = alpha;
    loop {
        let len = n_f * alpha_k;
        if len < min_len as f64 || len < 1.0 {
            break;
        }
        let count = 2 * (ceil_tol(1.0 / alpha_k) as usize) - 1;
        let width = (ceil_tol(len) as usize).min(n);
        let step = if count > 1 {
            (n_f - len) / (count - 1) as f64
        } else {
            0.0
        };
        for id in 0..count {
            let start = ((id as f64 * step).floor() as usize).min(n - width);
            push(Interval::new(start, start + width));
        }
        alpha_k *= alpha;
    }
    intervals
}

/// The whole range followed by random intervals of length `>= min_len` drawn
/// uniformly over `[0, n)` until `target` distinct intervals exist.
///
/// Returns the pool and whether the attempt budget ran out first.
pub fn wild_intervals(
    n: usize,
    target: usize,
    min_len: usize,
    seed: u64,
) -> Result<(Vec<Interval>, bool), SegError> {
    let full = Interval::new(0, n);
    let mut seen = BTreeSet::from([full]);
    let mut intervals = vec![full];
    let mut rng = rng_for(seed, Stream::WildIntervals, 0, n, 0);
    let max_attempts = target
        .checked_mul(64)
        .ok_or_else(|| SegError::resource_limit("wild interval attempt budget overflow"))?
        .max(4096);

    for _ in 0..max_attempts {
        if intervals.len() >= target {
            break;
        }
        let a = rng.gen_range(0..=n);
        let b = rng.gen_range(0..=n);
        let interval = Interval::new(a.min(b), a.max(b));
        if interval.len() < min_len.max(1) {
            continue;
        }
        if seen.insert(interval) {
            intervals.push(interval);
        }
    }

    let exhausted = intervals.len() < target;
    Ok((intervals, exhausted))
}

/// Produces the candidate splits examined for each node.
#[derive(Clone, Debug)]
pub struct CandidateGenerator<'a> {
    segmentation_type: SegmentationType,
    control: &'a ResolvedControl,
    pool: Vec<Interval>,
    warnings: Vec<String>,
}

impl<'a> CandidateGenerator<'a> {
    /// Builds the interval pool for `sbs` / `wbs`; `bs` has none.
    pub fn new(
        segmentation_type: SegmentationType,
        control: &'a ResolvedControl,
    ) -> Result<Self, SegError> {
        let n = control.n;
        let min_len = control.min_segment_len;
        let mut warnings = vec![];
        let pool = match segmentation_type {
            SegmentationType::Bs => vec![],
            SegmentationType::Sbs => {
                let alpha = control.seeded_segments_alpha.ok_or_else(|| {
                    SegError::invalid_input(
                        "segmentation type sbs requires Control.seeded_segments_alpha",
                    )
                })?;
                seeded_intervals(n, alpha, min_len)
            }
            SegmentationType::Wbs => {
                let target = control.number_of_wild_segments.ok_or_else(|| {
                    SegError::invalid_input(
                        "segmentation type wbs requires Control.number_of_wild_segments",
                    )
                })?;
                let (pool, exhausted) = wild_intervals(n, target, min_len, control.seed)?;
                if exhausted {
                    warnings.push(format!(
                        "wild interval pool exhausted: drew {} of {target} distinct intervals",
                        pool.len()
                    ));
                }
                pool
            }
        };

        Ok(Self {
            segmentation_type,
            control,
            pool,
            warnings,
        })
    }

    pub fn segmentation_type(&self) -> SegmentationType {
        self.segmentation_type
    }

    pub fn pool(&self) -> &[Interval] {
        &self.pool
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Admissible splits `start + L <= t < stop - L` outside every forbidden range.
    pub fn split_candidates(&self, start: usize, stop: usize) -> Vec<usize> {
        if !self.control.can_split(start, stop) {
            return vec![];
        }
        let min_len = self.control.min_segment_len;
        (start + min_len..stop - min_len)
            .filter(|&split| !self.control.is_forbidden(split))
            .collect()
    }

    /// Pool intervals lying inside `[start, stop)`, with their pool index.
    pub fn contained_intervals(
        &self,
        start: usize,
        stop: usize,
    ) -> impl Iterator<Item = (usize, Interval)> + '_ {
        let node = Interval::new(start, stop);
        self.pool
            .iter()
            .copied()
            .enumerate()
            .filter(move |&(_, interval)| node.contains(interval))
    }
}
