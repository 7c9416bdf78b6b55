// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::SegError;

pub const DEFAULT_MINIMAL_RELATIVE_SEGMENT_LENGTH: f64 = 0.01;
pub const DEFAULT_MODEL_SELECTION_ALPHA: f64 = 0.05;
pub const DEFAULT_MODEL_SELECTION_N_PERMUTATIONS: usize = 199;
pub const DEFAULT_SEED: u64 = 0;
pub const DEFAULT_N_ESTIMATORS: usize = 100;
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Number of features drawn at each split of a random-forest tree.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum MaxFeatures {
    /// Exactly this many features, capped at `d`.
    Value(usize),
    /// `ceil(fraction * d)` features.
    Fraction(f64),
    /// `floor(sqrt(d))` features.
    #[default]
    Sqrt,
    /// Every feature.
    All,
}

impl MaxFeatures {
    /// Resolves to a count in `1..=d`.
    pub fn resolve(&self, d: usize) -> usize {
        let resolved = match *self {
            Self::Value(count) => count,
            Self::Fraction(fraction) => (fraction * d as f64).ceil() as usize,
            Self::Sqrt => (d as f64).sqrt().floor() as usize,
            Self::All => d,
        };
        resolved.clamp(1, d.max(1))
    }

    fn validate(&self) -> Result<(), SegError> {
        match *self {
            Self::Value(0) => Err(SegError::invalid_input(
                "RandomForestParameters.max_features Value must be >= 1; got 0",
            )),
            Self::Fraction(fraction) if !(fraction > 0.0 && fraction <= 1.0) => {
                Err(SegError::invalid_input(format!(
                    "RandomForestParameters.max_features Fraction must be in (0, 1]; got {fraction}"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Hyperparameters of the random-forest classifier used by the `random_forest` gain.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct RandomForestParameters {
    pub n_estimators: usize,
    /// `None` grows trees until leaves are pure.
    pub max_depth: Option<usize>,
    pub max_features: MaxFeatures,
    /// Worker threads for fitting trees; `None` fits sequentially.
    pub n_jobs: Option<usize>,
}

impl Default for RandomForestParameters {
    fn default() -> Self {
        Self {
            n_estimators: DEFAULT_N_ESTIMATORS,
            max_depth: Some(DEFAULT_MAX_DEPTH),
            max_features: MaxFeatures::Sqrt,
            n_jobs: None,
        }
    }
}

impl RandomForestParameters {
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: Option<usize>) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn validate(&self) -> Result<(), SegError> {
        if self.n_estimators == 0 {
            return Err(SegError::invalid_input(
                "RandomForestParameters.n_estimators must be >= 1; got 0",
            ));
        }
        if matches!(self.max_depth, Some(0)) {
            return Err(SegError::invalid_input(
                "RandomForestParameters.max_depth must be >= 1 when provided; got 0",
            ));
        }
        if matches!(self.n_jobs, Some(0)) {
            return Err(SegError::invalid_input(
                "RandomForestParameters.n_jobs must be >= 1 when provided; got 0",
            ));
        }
        self.max_features.validate()
    }
}

/// Hyperparameters of a segmentation run.
///
/// Every field has a usable default except `number_of_wild_segments` and
/// `seeded_segments_alpha`, which the wild and seeded strategies require.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Control {
    /// Minimum segment length as a fraction of `n`; resolves to `L = ceil(fraction * n)`.
    pub minimal_relative_segment_length: f64,
    /// Gain floor below which a node is never split. `None` means `4 ln(n) / n`.
    pub minimal_gain_to_split: Option<f64>,
    pub model_selection_alpha: f64,
    pub model_selection_n_permutations: usize,
    pub number_of_wild_segments: Option<usize>,
    pub seeded_segments_alpha: Option<f64>,
    pub seed: u64,
    pub random_forest: RandomForestParameters,
    /// Pairs `(a, b)` forbidding every split `t` with `a < t <= b`.
    pub forbidden_segments: Vec<(usize, usize)>,
    /// Grow subtrees and run permutations on the rayon pool when available.
    pub parallel: bool,
}

impl Default for Control {
    fn default() -> Self {
        Self {
            minimal_relative_segment_length: DEFAULT_MINIMAL_RELATIVE_SEGMENT_LENGTH,
            minimal_gain_to_split: None,
            model_selection_alpha: DEFAULT_MODEL_SELECTION_ALPHA,
            model_selection_n_permutations: DEFAULT_MODEL_SELECTION_N_PERMUTATIONS,
            number_of_wild_segments: None,
            seeded_segments_alpha: None,
            seed: DEFAULT_SEED,
            random_forest: RandomForestParameters::default(),
            forbidden_segments: vec![],
            parallel: true,
        }
    }
}

impl Control {
    pub fn with_minimal_relative_segment_length(mut self, value: f64) -> Self {
        self.minimal_relative_segment_length = value;
        self
    }

    pub fn with_minimal_gain_to_split(mut self, value: f64) -> Self {
        self.minimal_gain_to_split = Some(value);
        self
    }

    pub fn with_model_selection_alpha(mut self, value: f64) -> Self {
        self.model_selection_alpha = value;
        self
    }

    pub fn with_model_selection_n_permutations(mut self, value: usize) -> Self {
        self.model_selection_n_permutations = value;
        self
    }

    pub fn with_number_of_wild_segments(mut self, value: usize) -> Self {
        self.number_of_wild_segments = Some(value);
        self
    }

    pub fn with_seeded_segments_alpha(mut self, value: f64) -> Self {
        self.seeded_segments_alpha = Some(value);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_random_forest(mut self, parameters: RandomForestParameters) -> Self {
        self.random_forest = parameters;
        self
    }

    pub fn with_forbidden_segments(mut self, segments: Vec<(usize, usize)>) -> Self {
        self.forbidden_segments = segments;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Checks every field that does not depend on the data.
    pub fn validate(&self) -> Result<(), SegError> {
        let fraction = self.minimal_relative_segment_length;
        if !(fraction > 0.0 && fraction <= 0.5) {
            return Err(SegError::invalid_input(format!(
                "Control.minimal_relative_segment_length must be in (0, 0.5]; got {fraction}"
            )));
        }

        if let Some(floor) = self.minimal_gain_to_split
            && !(floor.is_finite() && floor >= 0.0)
        {
            return Err(SegError::invalid_input(format!(
                "Control.minimal_gain_to_split must be finite and >= 0.0; got {floor}"
            )));
        }

        let alpha = self.model_selection_alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(SegError::invalid_input(format!(
                "Control.model_selection_alpha must be in (0, 1]; got {alpha}"
            )));
        }

        if self.model_selection_n_permutations == 0 {
            return Err(SegError::invalid_input(
                "Control.model_selection_n_permutations must be >= 1; got 0",
            ));
        }

        if matches!(self.number_of_wild_segments, Some(0)) {
            return Err(SegError::invalid_input(
                "Control.number_of_wild_segments must be >= 1 when provided; got 0",
            ));
        }

        if let Some(alpha) = self.seeded_segments_alpha
            && !(alpha > 0.0 && alpha < 1.0)
        {
            return Err(SegError::invalid_input(format!(
                "Control.seeded_segments_alpha must be in (0, 1) when provided; got {alpha}"
            )));
        }

        self.random_forest.validate()
    }

    /// Validates against a dataset of `n` rows and fixes every data-dependent default.
    pub fn resolve(&self, n: usize) -> Result<ResolvedControl, SegError> {
        self.validate()?;
        if n < 2 {
            return Err(SegError::invalid_input(format!("n must be >= 2, got {n}")));
        }

        for &(a, b) in &self.forbidden_segments {
            if a >= b {
                return Err(SegError::invalid_input(format!(
                    "Control.forbidden_segments entry ({a}, {b}) must satisfy a < b"
                )));
            }
            if b >= n {
                return Err(SegError::invalid_input(format!(
                    "Control.forbidden_segments entry ({a}, {b}) lies outside [0, {n})"
                )));
            }
        }
        let mut forbidden = self.forbidden_segments.clone();
        forbidden.sort_unstable();

        let min_segment_len =
            ((self.minimal_relative_segment_length * n as f64).ceil() as usize).max(1);
        let minimal_gain_to_split = self
            .minimal_gain_to_split
            .unwrap_or_else(|| default_minimal_gain_to_split(n));

        Ok(ResolvedControl {
            n,
            min_segment_len,
            minimal_gain_to_split,
            model_selection_alpha: self.model_selection_alpha,
            model_selection_n_permutations: self.model_selection_n_permutations,
            number_of_wild_segments: self.number_of_wild_segments,
            seeded_segments_alpha: self.seeded_segments_alpha,
            seed: self.seed,
            forbidden,
            parallel: self.parallel,
        })
    }
}

/// `4 ln(n) / n`, on the same scale as gains normalized by `n`.
pub fn default_minimal_gain_to_split(n: usize) -> f64 {
    let n = n as f64;
    4.0 * n.ln() / n
}

/// [`Control`] after validation against a dataset of `n` rows.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedControl {
    pub n: usize,
    /// `L`: no child may be shorter than this.
    pub min_segment_len: usize,
    pub minimal_gain_to_split: f64,
    pub model_selection_alpha: f64,
    pub model_selection_n_permutations: usize,
    pub number_of_wild_segments: Option<usize>,
    pub seeded_segments_alpha: Option<f64>,
    pub seed: u64,
    forbidden: Vec<(usize, usize)>,
    pub parallel: bool,
}

impl ResolvedControl {
    /// Whether `split` falls inside a forbidden range.
    pub fn is_forbidden(&self, split: usize) -> bool {
        self.forbidden
            .iter()
            .take_while(|&&(a, _)| a < split)
            .any(|&(_, b)| split <= b)
    }

    pub fn forbidden_segments(&self) -> &[(usize, usize)] {
        &self.forbidden
    }

    /// Whether a node `[start, stop)` is long enough to host two children of length `L`.
    pub fn can_split(&self, start: usize, stop: usize) -> bool {
        stop.saturating_sub(start) >= 2 * self.min_segment_len
    }
}

#[cfg(test)]
mod tests {
    use super::{Control, MaxFeatures, RandomForestParameters, default_minimal_gain_to_split};

    #[test]
    fn defaults_match_documented_values() {
        let control = Control::default();
        assert_eq!(control.minimal_relative_segment_length, 0.01);
        assert_eq!(control.model_selection_alpha, 0.05);
        assert_eq!(control.model_selection_n_permutations, 199);
        assert_eq!(control.seed, 0);
        assert!(control.minimal_gain_to_split.is_none());
        assert!(control.number_of_wild_segments.is_none());
        assert!(control.seeded_segments_alpha.is_none());
        assert!(control.forbidden_segments.is_empty());

        let forest = RandomForestParameters::default();
        assert_eq!(forest.n_estimators, 100);
        assert_eq!(forest.max_depth, Some(8));
        assert_eq!(forest.max_features, MaxFeatures::Sqrt);
        assert_eq!(forest.n_jobs, None);
    }

    #[test]
    fn resolve_fixes_segment_length_and_gain_floor() {
        let resolved = Control::default()
            .with_minimal_relative_segment_length(0.1)
            .resolve(150)
            .expect("valid control");
        assert_eq!(resolved.min_segment_len, 15);
        assert!((resolved.minimal_gain_to_split - 4.0 * 150f64.ln() / 150.0).abs() < 1e-15);
        assert!(resolved.can_split(0, 30));
        assert!(!resolved.can_split(0, 29));

        let tiny = Control::default().resolve(10).expect("valid control");
        assert_eq!(tiny.min_segment_len, 1);

        let explicit = Control::default()
            .with_minimal_gain_to_split(0.5)
            .resolve(100)
            .expect("valid control");
        assert_eq!(explicit.minimal_gain_to_split, 0.5);
    }

    #[test]
    fn default_gain_floor_shrinks_with_n() {
        assert!(default_minimal_gain_to_split(1_000) < default_minimal_gain_to_split(100));
    }

    #[test]
    fn forbidden_ranges_exclude_left_open_right_closed_indices() {
        let resolved = Control::default()
            .with_forbidden_segments(vec![(101, 120), (0, 49)])
            .resolve(150)
            .expect("valid control");

        assert!(!resolved.is_forbidden(0));
        assert!(resolved.is_forbidden(1));
        assert!(resolved.is_forbidden(49));
        assert!(!resolved.is_forbidden(50));
        assert!(!resolved.is_forbidden(101));
        assert!(resolved.is_forbidden(102));
        assert!(resolved.is_forbidden(120));
        assert!(!resolved.is_forbidden(121));
        assert_eq!(resolved.forbidden_segments(), &[(0, 49), (101, 120)]);
    }

    #[test]
    fn rejects_malformed_forbidden_ranges() {
        let err = Control::default()
            .with_forbidden_segments(vec![(10, 10)])
            .resolve(20)
            .expect_err("empty range must fail");
        assert!(err.to_string().contains("must satisfy a < b"));

        let err = Control::default()
            .with_forbidden_segments(vec![(5, 20)])
            .resolve(20)
            .expect_err("out of range must fail");
        assert!(err.to_string().contains("outside [0, 20)"));
    }

    #[test]
    fn rejects_out_of_range_hyperparameters() {
        let cases = [
            (
                Control::default().with_minimal_relative_segment_length(0.0),
                "minimal_relative_segment_length",
            ),
            (
                Control::default().with_minimal_relative_segment_length(0.6),
                "minimal_relative_segment_length",
            ),
            (
                Control::default().with_minimal_gain_to_split(f64::NAN),
                "minimal_gain_to_split",
            ),
            (
                Control::default().with_model_selection_alpha(0.0),
                "model_selection_alpha",
            ),
            (
                Control::default().with_model_selection_n_permutations(0),
                "model_selection_n_permutations",
            ),
            (
                Control::default().with_number_of_wild_segments(0),
                "number_of_wild_segments",
            ),
            (
                Control::default().with_seeded_segments_alpha(1.0),
                "seeded_segments_alpha",
            ),
            (
                Control::default()
                    .with_random_forest(RandomForestParameters::default().with_n_estimators(0)),
                "n_estimators",
            ),
            (
                Control::default()
                    .with_random_forest(RandomForestParameters::default().with_max_depth(Some(0))),
                "max_depth",
            ),
            (
                Control::default()
                    .with_random_forest(RandomForestParameters::default().with_n_jobs(Some(0))),
                "n_jobs",
            ),
            (
                Control::default().with_random_forest(
                    RandomForestParameters::default()
                        .with_max_features(MaxFeatures::Fraction(1.5)),
                ),
                "max_features",
            ),
        ];

        for (control, field) in cases {
            let err = control.validate().expect_err("invalid control must fail");
            assert!(
                err.to_string().contains(field),
                "expected {field} in error, got {err}"
            );
        }
    }

    #[test]
    fn rejects_too_few_rows() {
        let err = Control::default().resolve(1).expect_err("n=1 must fail");
        assert!(err.to_string().contains("n must be >= 2"));
    }

    #[test]
    fn max_features_resolves_within_bounds() {
        assert_eq!(MaxFeatures::Sqrt.resolve(4), 2);
        assert_eq!(MaxFeatures::Sqrt.resolve(1), 1);
        assert_eq!(MaxFeatures::Sqrt.resolve(10), 3);
        assert_eq!(MaxFeatures::Value(7).resolve(4), 4);
        assert_eq!(MaxFeatures::Fraction(0.5).resolve(5), 3);
        assert_eq!(MaxFeatures::All.resolve(6), 6);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn control_serde_roundtrip() {
        let control = Control::default()
            .with_seeded_segments_alpha(0.5)
            .with_forbidden_segments(vec![(3, 9)])
            .with_random_forest(
                RandomForestParameters::default().with_max_features(MaxFeatures::Fraction(0.25)),
            );
        let encoded = serde_json::to_string(&control).expect("control should serialize");
        let decoded: Control = serde_json::from_str(&encoded).expect("control should deserialize");
        assert_eq!(decoded, control);
    }
}
