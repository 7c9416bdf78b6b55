// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence, TestCaseError};
use segtree_core::{Control, RawData, ResolvedControl};
use segtree_offline::{CandidateGenerator, GainKind, SegmentationResult, SegmentationType, run};

const MIN_PROPTEST_CASES: u32 = 128;
const N_PERMUTATIONS: usize = 9;

fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .map(|parsed| parsed.max(MIN_PROPTEST_CASES))
        .unwrap_or(MIN_PROPTEST_CASES)
}

/// Row-major noise with a level shift of `jump` from row `shift_at` on.
fn series() -> impl Strategy<Value = (Vec<f64>, usize, usize)> {
    (16usize..96, 1usize..4, 0.2f64..0.8, 0.0f64..8.0).prop_flat_map(|(n, d, shift, jump)| {
        prop::collection::vec(-1.0f64..1.0, n * d).prop_map(move |mut values| {
            let shift_at = (shift * n as f64) as usize;
            for value in &mut values[shift_at * d..] {
                *value += jump;
            }
            (values, n, d)
        })
    })
}

fn segmentation_type() -> impl Strategy<Value = SegmentationType> {
    prop_oneof![
        Just(SegmentationType::Bs),
        Just(SegmentationType::Sbs),
        Just(SegmentationType::Wbs),
    ]
}

fn control_for(n: usize, forbidden: Option<(usize, usize)>) -> Control {
    let mut control = Control::default()
        .with_minimal_relative_segment_length(0.1)
        .with_model_selection_n_permutations(N_PERMUTATIONS)
        .with_seeded_segments_alpha(0.5)
        .with_number_of_wild_segments(20)
        .with_parallel(false);
    if let Some((a, len)) = forbidden {
        let a = a % (n - 1);
        let b = (a + 1 + len).min(n - 1);
        control = control.with_forbidden_segments(vec![(a, b)]);
    }
    control
}

fn assert_tree_invariants(
    result: &SegmentationResult,
    resolved: &ResolvedControl,
) -> Result<(), TestCaseError> {
    let n = result.n();
    let min_len = resolved.min_segment_len;
    let root = result.root();
    prop_assert_eq!((root.start, root.stop), (0, n));

    let mut leaves = vec![];
    for node in result.nodes() {
        match (result.left(node), result.right(node)) {
            (Some(left), Some(right)) => {
                let split = node.best_split.ok_or_else(|| {
                    TestCaseError::fail("split node without best_split")
                })?;
                prop_assert!(node.is_significant);
                prop_assert_eq!((left.start, left.stop), (node.start, split));
                prop_assert_eq!((right.start, right.stop), (split, node.stop));
                prop_assert!(split - node.start >= min_len);
                prop_assert!(node.stop - split >= min_len);
                prop_assert!(!resolved.is_forbidden(split));
            }
            (None, None) => {
                prop_assert!(!node.is_significant);
                leaves.push((node.start, node.stop));
            }
            _ => prop_assert!(false, "node with a single child"),
        }
    }

    leaves.sort_unstable();
    prop_assert_eq!(leaves.first().map(|l| l.0), Some(0));
    prop_assert_eq!(leaves.last().map(|l| l.1), Some(n));
    prop_assert!(leaves.windows(2).all(|w| w[0].1 == w[1].0));

    let splits = result.split_points();
    let boundaries: Vec<usize> = leaves.iter().skip(1).map(|l| l.0).collect();
    prop_assert_eq!(&splits, &boundaries);
    prop_assert_eq!(
        result.segments().len(),
        result.pool_size() + 2 * splits.len() + 1
    );

    for p_value in result.nodes().filter_map(|node| node.p_value) {
        let scaled = p_value * (N_PERMUTATIONS + 1) as f64;
        prop_assert!((scaled - scaled.round()).abs() < 1e-9, "p-value {} off lattice", p_value);
        prop_assert!((1.0..=(N_PERMUTATIONS + 1) as f64).contains(&scaled.round()));
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: proptest_cases(),
        max_shrink_iters: 1024,
        failure_persistence: Some(Box::new(FileFailurePersistence::Direct("proptest-regressions/tests/proptest_invariants.txt"))),
        .. ProptestConfig::default()
    })]

    #[test]
    fn segmentation_trees_respect_structural_invariants(
        (values, n, d) in series(),
        segmentation_type in segmentation_type(),
        forbidden in prop::option::of((0usize..96, 0usize..20)),
    ) {
        let control = control_for(n, forbidden);
        let resolved = control.resolve(n).expect("generated control is valid");
        let data = RawData::from_rows(&values, n, d).expect("generated data is valid");
        let result = run(&data, GainKind::ChangeInMean, segmentation_type, &control)
            .expect("segmentation should succeed");

        assert_tree_invariants(&result, &resolved)?;
        prop_assert_eq!(result.diagnostics().nodes_evaluated, result.nodes().count());
    }

    #[test]
    fn exhaustive_candidates_are_exactly_the_admissible_splits(
        n in 4usize..200,
        fraction in 0.01f64..0.5,
        forbidden in prop::collection::vec((0usize..199, 1usize..30), 0..4),
    ) {
        let forbidden: Vec<(usize, usize)> = forbidden
            .into_iter()
            .map(|(a, len)| {
                let a = a % (n - 1);
                (a, (a + len).min(n - 1))
            })
            .collect();
        let resolved = Control::default()
            .with_minimal_relative_segment_length(fraction)
            .with_forbidden_segments(forbidden.clone())
            .resolve(n)
            .expect("generated control is valid");
        let generator = CandidateGenerator::new(SegmentationType::Bs, &resolved)
            .expect("bs needs no pool");

        let min_len = resolved.min_segment_len;
        let expected: Vec<usize> = (0..n)
            .filter(|&t| t >= min_len && t + min_len < n)
            .filter(|&t| !forbidden.iter().any(|&(a, b)| a < t && t <= b))
            .collect();
        prop_assert_eq!(generator.split_candidates(0, n), expected);
    }

    #[test]
    fn runs_are_deterministic_for_a_fixed_seed(
        (values, n, d) in series(),
        segmentation_type in segmentation_type(),
        seed in any::<u64>(),
    ) {
        let control = control_for(n, None).with_seed(seed);
        let data = RawData::from_rows(&values, n, d).expect("generated data is valid");
        let first = run(&data, GainKind::Knn, segmentation_type, &control)
            .expect("segmentation should succeed");
        let second = run(&data, GainKind::Knn, segmentation_type, &control.with_parallel(true))
            .expect("segmentation should succeed");
        prop_assert_eq!(first.segments(), second.segments());
    }
}
