//! Benchmarks for weighted sampling and queue refill
//!
//! Tests performance of the per-file inclusion decision and of refilling the
//! pending queue from a large set of discovered folders.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use slidequeue::config::{Config, EngineConfig, PriorityPattern, ProviderMode};
use slidequeue::queue::{FolderNode, ScanSession};
use slidequeue::scanner::WeightedSampler;
use slidequeue_common::{MediaItem, MediaKind};

fn engine(patterns: usize) -> EngineConfig {
    let mut config = Config::for_root("media", ProviderMode::Random);
    config.engine.seed = Some(1);
    config.sampling.priority_patterns = (0..patterns)
        .map(|i| PriorityPattern {
            pattern: format!("^media/(favourites|album{i:03})(/|$)"),
            multiplier: 2.0 + i as f64,
        })
        .collect();
    config.resolve().expect("bench config resolves")
}

/// A session holding `folders` listed folders of `per_folder` files each.
fn populated_session(config: &EngineConfig, folders: usize, per_folder: usize) -> ScanSession {
    let sampler = WeightedSampler::from_config(config);
    let mut session = ScanSession::new("media", config);
    session.begin_pass();
    let pass = session.pass();
    for f in 0..folders {
        let path = format!("media/album{f:04}");
        let files: Vec<MediaItem> = (0..per_folder)
            .map(|n| {
                let title = format!("img{n:05}.jpg");
                MediaItem::from_listing(format!("{path}/{title}"), title, MediaKind::Image, &path)
            })
            .collect();
        for file in &files {
            session.register(file);
        }
        session.record_folder(FolderNode {
            weight: sampler.folder_weight(&path, files.len()),
            path,
            depth: 1,
            files,
            subfolders: Vec::new(),
            pass,
        });
    }
    session.complete_pass();
    session
}

fn bench_folder_weight(c: &mut Criterion) {
    let mut group = c.benchmark_group("folder_weight");

    for patterns in [0, 5, 20] {
        let sampler = WeightedSampler::from_config(&engine(patterns));
        group.bench_with_input(
            BenchmarkId::new("patterns", patterns),
            &sampler,
            |b, sampler| {
                b.iter(|| sampler.folder_weight(black_box("media/album004/trip"), black_box(2_500)));
            },
        );
    }

    group.finish();
}

fn bench_should_include(c: &mut Criterion) {
    let mut group = c.benchmark_group("should_include");
    let sampler = WeightedSampler::from_config(&engine(5));
    let mut rng = StdRng::seed_from_u64(7);

    group.bench_function("large_collection", |b| {
        b.iter(|| {
            sampler.should_include(
                &mut rng,
                black_box("media/album002"),
                black_box(250_000),
                black_box(60),
            )
        });
    });

    group.bench_function("small_queue", |b| {
        b.iter(|| {
            sampler.should_include(
                &mut rng,
                black_box("media/other"),
                black_box(250_000),
                black_box(5),
            )
        });
    });

    group.finish();
}

fn bench_refill(c: &mut Criterion) {
    let mut group = c.benchmark_group("refill");
    let config = engine(0);

    for folders in [10, 100, 1_000] {
        group.bench_with_input(BenchmarkId::new("folders", folders), &folders, |b, &folders| {
            b.iter_batched(
                || populated_session(&config, folders, 50),
                |mut session| session.refill(black_box(100)),
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_folder_weight, bench_should_include, bench_refill);
criterion_main!(benches);
