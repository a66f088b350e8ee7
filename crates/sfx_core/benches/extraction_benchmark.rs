//! Feature extraction benchmarks
//!
//! Measures whole-extractor throughput and the cost of stage sharing.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use sfx_core::{ExtractorConfig, FeatureExtractor, TransformRegistry};

fn test_signal(len: usize) -> Vec<i16> {
    (0..len)
        .map(|i| ((i as f32 * 0.05).sin() * 10000.0) as i16)
        .collect()
}

fn benchmark_speech_default(c: &mut Criterion) {
    let mut group = c.benchmark_group("speech_default");

    for workers in [1, 2, 4].iter() {
        let config = ExtractorConfig {
            workers: *workers,
            ..ExtractorConfig::speech_default()
        };
        let extractor = FeatureExtractor::new(&config, TransformRegistry::global()).unwrap();
        let pcm = test_signal(config.buffer_size);

        group.throughput(Throughput::Elements(config.buffer_size as u64));
        group.bench_function(format!("extract_{}_workers", workers), |b| {
            b.iter(|| extractor.extract(black_box(&pcm)).unwrap())
        });
    }

    group.finish();
}

fn benchmark_shared_prefix(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared_prefix");
    let pcm = test_signal(8192);

    // Four features over one windowed autocorrelation, computed once per call
    let shared = FeatureExtractor::from_descriptions(
        &[
            "A [Window(length=1024, step=512), Autocorrelation]",
            "B [Window(length=1024, step=512), Autocorrelation, Energy]",
            "C [Window(length=1024, step=512), Autocorrelation, Flux]",
            "D [Window(length=1024, step=512), Autocorrelation, Diffrect]",
        ],
        8192,
        16000,
    )
    .unwrap();
    group.bench_function("four_features_one_prefix", |b| {
        b.iter(|| shared.extract(black_box(&pcm)).unwrap())
    });

    let single = FeatureExtractor::from_descriptions(
        &["A [Window(length=1024, step=512), Autocorrelation]"],
        8192,
        16000,
    )
    .unwrap();
    group.bench_function("single_feature", |b| {
        b.iter(|| single.extract(black_box(&pcm)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, benchmark_speech_default, benchmark_shared_prefix);
criterion_main!(benches);
