// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Recursive binary segmentation of multivariate series.
//!
//! [`run`] grows a binary tree over the rows of a dataset. Each node is split
//! at the candidate maximizing the chosen gain model, and the split is kept
//! only if it clears the gain floor and a permutation test.

pub mod candidates;
pub mod model_selection;
pub mod optimizer;
mod render;
pub mod result;
mod tree;

pub use candidates::{CandidateGenerator, Interval, SegmentationType};
pub use model_selection::{ModelSelectionResult, ModelSelector};
pub use optimizer::{GainResult, Optimizer, OptimizerResult};
pub use result::{Segment, SegmentationResult};
pub use segtree_core::{Control, Diagnostics, MemoryLayout, RawData, SegError};
pub use segtree_gain::{GainKind, GainModel};

use segtree_core::ResolvedControl;
use std::borrow::Cow;
use std::time::Instant;
use tree::TreeBuilder;

/// Segments `x` with a built-in gain model.
pub fn run(
    x: &RawData<'_>,
    method: GainKind,
    segmentation_type: SegmentationType,
    control: &Control,
) -> Result<SegmentationResult, SegError> {
    control.validate()?;
    let model = method.build(control)?;
    run_with_model(x, model.as_ref(), segmentation_type, control)
}

/// Segments `x` with any [`GainModel`].
pub fn run_with_model(
    x: &RawData<'_>,
    model: &dyn GainModel,
    segmentation_type: SegmentationType,
    control: &Control,
) -> Result<SegmentationResult, SegError> {
    let started_at = Instant::now();
    let resolved = control.resolve(x.n())?;
    let generator = CandidateGenerator::new(segmentation_type, &resolved)?;

    tracing::info!(
        n = x.n(),
        d = x.d(),
        gain_model = model.name(),
        segmentation_type = segmentation_type.as_str(),
        min_segment_len = resolved.min_segment_len,
        minimal_gain_to_split = resolved.minimal_gain_to_split,
        pool_size = generator.pool().len(),
        parallel = resolved.parallel,
        "segmentation started"
    );

    let tree = TreeBuilder::new(*x, model, &generator, &resolved).build()?;

    let nodes_evaluated = tree.segments.len() - tree.pool_size;
    let tested = tree.segments[tree.pool_size..]
        .iter()
        .filter(|segment| segment.p_value.is_some())
        .count();
    let permutations_run = tested * resolved.model_selection_n_permutations;
    let runtime_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);

    let diagnostics = Diagnostics {
        n: x.n(),
        d: x.d(),
        runtime_ms: Some(runtime_ms),
        notes: vec![format!(
            "min_segment_len={}, minimal_gain_to_split={}, nodes_evaluated={nodes_evaluated}, permutation_tests={tested}",
            resolved.min_segment_len, resolved.minimal_gain_to_split
        )],
        warnings: generator.warnings().to_vec(),
        algorithm: Cow::Borrowed(segmentation_type.as_str()),
        gain_model: Cow::Borrowed(model.name()),
        seed: Some(resolved.seed),
        thread_count: thread_count(&resolved),
        #[cfg(feature = "serde")]
        params_json: serde_json::to_value(control).ok(),
        pool_size: tree.pool_size,
        nodes_evaluated,
        permutations_run,
        ..Diagnostics::default()
    };

    let result = SegmentationResult::new(x.n(), tree.segments, tree.pool_size, diagnostics);
    tracing::info!(
        split_points = ?result.split_points(),
        nodes_evaluated,
        permutations_run,
        runtime_ms,
        "segmentation finished"
    );
    Ok(result)
}

#[cfg(feature = "rayon")]
fn thread_count(control: &ResolvedControl) -> Option<usize> {
    control.parallel.then(rayon::current_num_threads)
}

#[cfg(not(feature = "rayon"))]
fn thread_count(_: &ResolvedControl) -> Option<usize> {
    None
}
