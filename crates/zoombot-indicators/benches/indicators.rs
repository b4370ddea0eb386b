//! Benchmarks for indicator seeding and incremental updates.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use zoombot_core::traits::Indicator;
use zoombot_core::types::Timeframe;
use zoombot_indicators::{Ema, IndicatorSet, MacdParams};

fn generate_test_data(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 100.0 + (i as f64 * 0.1).sin() * 10.0)
        .collect()
}

fn benchmark_ema(c: &mut Criterion) {
    let mut group = c.benchmark_group("EMA");

    for size in [1000, 10000, 100000].iter() {
        let data = generate_test_data(*size);

        group.bench_with_input(BenchmarkId::new("calculate", size), &data, |b, data| {
            let ema = Ema::new(26);
            b.iter(|| ema.calculate(black_box(data)))
        });
    }

    group.finish();
}

fn benchmark_indicator_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("IndicatorSet");

    for size in [1440, 10000].iter() {
        let data = generate_test_data(*size);

        group.bench_with_input(BenchmarkId::new("seed", size), &data, |b, data| {
            let mut set = IndicatorSet::new(Timeframe::Minute1, MacdParams::default(), *size);
            b.iter(|| set.seed(black_box(data)))
        });

        group.bench_with_input(BenchmarkId::new("update", size), &data, |b, data| {
            let mut set = IndicatorSet::new(Timeframe::Minute1, MacdParams::default(), *size);
            set.seed(data);
            b.iter(|| {
                let evicted = set.update(black_box(101.5)).ok().flatten();
                set.undo_update(evicted);
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_ema, benchmark_indicator_set);
criterion_main!(benches);
