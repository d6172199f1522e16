use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use quill_core::diff::{diff_ropes, DiffOptions};
use quill_core::Rope;

fn synthetic_lines(n: usize) -> String {
    (0..n).map(|i| format!("line number {i} of the file\n")).collect()
}

fn diff_small_change(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_small_change");

    group.bench_function("1000_lines_one_edit", |b| {
        let old = Rope::from_str(&synthetic_lines(1_000));
        let mut text = synthetic_lines(1_000);
        text.insert_str(0, "an inserted line\n");
        let new = Rope::from_str(&text);
        b.iter(|| black_box(diff_ropes(&old, &new, DiffOptions::default())))
    });

    group.finish();
}

fn diff_large_rewrite(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_large_rewrite");

    group.bench_function("5000_lines_fully_shuffled", |b| {
        let old = Rope::from_str(&synthetic_lines(5_000));
        let shuffled: String = (0..5_000)
            .rev()
            .map(|i| format!("line number {i} of the file\n"))
            .collect();
        let new = Rope::from_str(&shuffled);
        b.iter(|| black_box(diff_ropes(&old, &new, DiffOptions::default())))
    });

    group.finish();
}

fn diff_identical(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_identical");

    group.bench_function("2000_lines_no_change", |b| {
        let text = synthetic_lines(2_000);
        let old = Rope::from_str(&text);
        let new = Rope::from_str(&text);
        b.iter(|| black_box(diff_ropes(&old, &new, DiffOptions::default())))
    });

    group.finish();
}

criterion_group!(benches, diff_small_change, diff_large_rewrite, diff_identical);
criterion_main!(benches);
