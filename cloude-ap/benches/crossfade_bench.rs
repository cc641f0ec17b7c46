//! Performance benchmarks for crossfade operations
//!
//! Measures:
//! - Curve pair generation per fade law
//! - Scheduling a crossfade onto two gain parameters
//! - Evaluating a scheduled gain across the fade

use cloude_ap::audio::{AudioGraph, ManualClock, ParamKind};
use cloude_ap::playback::crossfade::CrossfadeScheduler;
use cloude_ap::playback::gain_registry::GAIN_FLOOR;
use cloude_common::fade_curves::DEFAULT_CURVE_STEPS;
use cloude_common::FadeCurve;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

fn bench_curve_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("curve_generation");

    for &curve in FadeCurve::all_variants() {
        group.bench_function(BenchmarkId::new("pair", curve.as_str()), |b| {
            b.iter(|| black_box(curve.crossfade_pair(black_box(DEFAULT_CURVE_STEPS), 0.8)))
        });
    }

    group.finish();
}

fn bench_schedule(c: &mut Criterion) {
    let scheduler = CrossfadeScheduler::default();

    c.bench_function("schedule_crossfade", |b| {
        let clock = ManualClock::new();
        let mut graph = AudioGraph::new(48_000, Arc::new(clock.clone()));
        let outgoing = graph.create_gain(0.8);
        let incoming = graph.create_gain(GAIN_FLOOR);
        b.iter(|| {
            // Start each round from clean parameters
            for (node, value) in [(outgoing, 0.8), (incoming, GAIN_FLOOR)] {
                if let Ok(param) = graph.param_mut(node, ParamKind::Gain) {
                    let _ = param.set_value(value);
                }
            }
            black_box(scheduler.schedule(&mut graph, outgoing, incoming, 0.8).ok())
        })
    });
}

fn bench_gain_evaluation(c: &mut Criterion) {
    let clock = ManualClock::new();
    let mut graph = AudioGraph::new(48_000, Arc::new(clock.clone()));
    let outgoing = graph.create_gain(0.8);
    let incoming = graph.create_gain(GAIN_FLOOR);
    let scheduler = CrossfadeScheduler::default();
    if scheduler.schedule(&mut graph, outgoing, incoming, 0.8).is_err() {
        return;
    }
    let Ok(param) = graph.param(incoming, ParamKind::Gain) else {
        return;
    };

    // One value per 128-frame render quantum over the whole fade
    let quanta = (scheduler.duration() * 48_000.0 / 128.0) as usize;
    c.bench_function("evaluate_fade", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for i in 0..quanta {
                sum += param.value_at(i as f64 * 128.0 / 48_000.0);
            }
            black_box(sum)
        })
    });
}

criterion_group!(benches, bench_curve_generation, bench_schedule, bench_gain_evaluation);
criterion_main!(benches);
