use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use drop_settle::*;
use std::hint::black_box;

fn prepare_session<B: PhysicsBackend>(backend: B, scene: &SceneConfig) -> (EngineSession<B>, DropScene) {
    let mut session = EngineSession::initialize(backend, ConnectionMode::Direct).unwrap();
    session.configure(&SimulationConfig::default()).unwrap();
    let bodies = DropScene::setup(&mut session, scene).unwrap();
    (session, bodies)
}

fn bench_scripted_trial(c: &mut Criterion) {
    let mut group = c.benchmark_group("scripted_trial");
    for &height in &[0.5f32, 1.0, 1.5] {
        group.bench_with_input(BenchmarkId::from_parameter(height), &height, |b, &height| {
            let (mut session, bodies) =
                prepare_session(ScriptedBackend::default(), &SceneConfig::default());
            let mut harness = TrialHarness::new(
                &mut session,
                bodies.object,
                OrientationSampler::from_seed(1),
                HarnessSettings::default(),
            );
            b.iter(|| harness.run_trial(black_box(height), 0).unwrap())
        });
    }
    group.finish();
}

fn bench_scripted_sweep(c: &mut Criterion) {
    let config = HarnessConfig::default();
    let heights = config.sweep.heights();
    c.bench_function("scripted_sweep_reference", |b| {
        b.iter(|| {
            let (mut session, bodies) =
                prepare_session(ScriptedBackend::default(), &config.scene);
            let mut harness = TrialHarness::new(
                &mut session,
                bodies.object,
                OrientationSampler::from_seed(7),
                HarnessSettings::from_config(&config),
            );
            black_box(harness.run_sweep(&heights, 1).unwrap())
        })
    });
}

#[cfg(feature = "rapier")]
fn bench_rapier_steps(c: &mut Criterion) {
    let model = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(config::DEFAULT_OBJECT_MODEL);
    let mut scene = SceneConfig::default();
    scene.object.model = model;

    let mut group = c.benchmark_group("rapier_trial");
    group.sample_size(10);
    for &budget in &[240u64, 960] {
        group.bench_with_input(BenchmarkId::new("steps", budget), &budget, |b, &budget| {
            let (mut session, bodies) = prepare_session(RapierBackend::new(), &scene);
            let mut harness = TrialHarness::new(
                &mut session,
                bodies.object,
                OrientationSampler::from_seed(3),
                HarnessSettings {
                    max_steps_per_trial: Some(budget),
                    ..HarnessSettings::default()
                },
            );
            b.iter(|| harness.run_trial(black_box(1.0), 0).unwrap())
        });
    }
    group.finish();
}

#[cfg(not(feature = "rapier"))]
fn bench_rapier_steps(_: &mut Criterion) {}

criterion_group!(
    benches,
    bench_scripted_trial,
    bench_scripted_sweep,
    bench_rapier_steps
);
criterion_main!(benches);
