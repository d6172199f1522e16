use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use quill_core::{Engine, EngineConfig};

fn engine_with(content: &str) -> Engine {
    Engine::new(EngineConfig {
        initial_content: content.to_string(),
        ..EngineConfig::default()
    })
}

fn history_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_push");

    group.bench_function("insert_100_entries", |b| {
        b.iter_batched(
            || engine_with(""),
            |engine| {
                for i in 0..100 {
                    engine.insert(engine.len(), &format!("line {i}\n")).unwrap();
                }
                engine
            },
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn history_undo_redo(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_undo_redo");

    group.bench_function("undo_redo_small", |b| {
        b.iter_batched(
            || {
                let engine = engine_with("");
                for i in 0..100 {
                    engine.insert(engine.len(), &format!("line {i}\n")).unwrap();
                }
                engine
            },
            |engine| {
                for _ in 0..50 {
                    black_box(engine.undo().unwrap());
                }
                for _ in 0..50 {
                    black_box(engine.redo().unwrap());
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });

    group.bench_function("undo_deep_stack", |b| {
        b.iter_batched(
            || {
                let engine = engine_with("");
                for i in 0..1_000 {
                    engine.insert(engine.len(), &format!("line {i}\n")).unwrap();
                }
                engine
            },
            |engine| {
                for _ in 0..1_000 {
                    black_box(engine.undo().unwrap());
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, history_push, history_undo_redo);
criterion_main!(benches);
