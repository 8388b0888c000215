use drop_settle::*;

fn main() -> Result<()> {
    let mut config = HarnessConfig::default();
    config.sweep.seed = Some(7);
    config.settle.max_steps_per_trial = Some(20_000);

    let mut session = EngineSession::initialize(RapierBackend::new(), ConnectionMode::Direct)?;
    session.configure(&config.simulation)?;
    let scene = DropScene::setup(&mut session, &config.scene)?;

    let mut harness = TrialHarness::new(
        &mut session,
        scene.object,
        OrientationSampler::new(config.sweep.seed),
        HarnessSettings::from_config(&config),
    );
    let report = harness.run_sweep(&config.sweep.heights(), config.sweep.trials_per_height)?;
    println!("{report}");

    session.teardown()
}
