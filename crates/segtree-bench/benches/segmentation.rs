// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use segtree_bench::{even_breaks, piecewise_constant};
use segtree_core::{Control, RawData};
use segtree_offline::{GainKind, SegmentationType, run};

fn bench_run(
    c: &mut Criterion,
    case_id: &str,
    n: usize,
    method: GainKind,
    segmentation_type: SegmentationType,
    control: Control,
) {
    let values = piecewise_constant(n, 3, &even_breaks(n, 4));
    let data = RawData::from_rows(&values, n, 3).expect("benchmark data should be valid");

    c.bench_function(case_id, |b| {
        b.iter(|| {
            run(black_box(&data), method, segmentation_type, &control)
                .expect("segmentation benchmark should succeed");
        })
    });
}

fn benchmark_change_in_mean(c: &mut Criterion) {
    let control = Control::default().with_model_selection_n_permutations(49);
    bench_run(
        c,
        "bs_change_in_mean_n1e4",
        10_000,
        GainKind::ChangeInMean,
        SegmentationType::Bs,
        control.clone(),
    );
    bench_run(
        c,
        "wbs_change_in_mean_n1e4_m100",
        10_000,
        GainKind::ChangeInMean,
        SegmentationType::Wbs,
        control.with_number_of_wild_segments(100),
    );
}

fn benchmark_knn(c: &mut Criterion) {
    let control = Control::default().with_model_selection_n_permutations(19);
    bench_run(c, "bs_knn_n1e3", 1_000, GainKind::Knn, SegmentationType::Bs, control);
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = benchmark_change_in_mean, benchmark_knn
}
criterion_main!(benches);
