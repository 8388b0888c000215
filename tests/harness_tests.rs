use drop_settle::*;

fn configured_session(backend: ScriptedBackend) -> (EngineSession<ScriptedBackend>, BodyHandle) {
    let mut session = EngineSession::initialize(backend, ConnectionMode::Direct)
        .expect("scripted backend should connect");
    session
        .configure(&SimulationConfig::default())
        .expect("configure should succeed");
    let object = session
        .load_body("object.urdf", &LoadOptions::with_inertia_from_file())
        .expect("scripted backend accepts any model");
    (session, object)
}

fn settings(steps: u32) -> HarnessSettings {
    HarnessSettings {
        settle_steps: steps,
        ..HarnessSettings::default()
    }
}

#[test]
fn sweep_runs_every_trial_in_height_then_index_order() {
    let backend = ScriptedBackend::with_heights(vec![0.0]);
    let log = backend.call_log();
    let (mut session, object) = configured_session(backend);
    let mut harness =
        TrialHarness::new(&mut session, object, OrientationSampler::from_seed(11), settings(5));

    let heights = [0.3, 0.1, 0.2];
    let report = harness.run_sweep(&heights, 2).expect("sweep should succeed");

    let order: Vec<(f32, usize)> = report.trials.iter().map(|t| (t.height, t.index)).collect();
    assert_eq!(
        order,
        vec![(0.3, 0), (0.3, 1), (0.1, 0), (0.1, 1), (0.2, 0), (0.2, 1)]
    );

    let reset_heights: Vec<f32> = log.resets().iter().map(|p| p.position.z).collect();
    assert_eq!(reset_heights, vec![0.3, 0.3, 0.1, 0.1, 0.2, 0.2]);
}

#[test]
fn every_drop_starts_above_the_origin() {
    let backend = ScriptedBackend::with_heights(vec![0.0]);
    let log = backend.call_log();
    let (mut session, object) = configured_session(backend);
    let mut harness =
        TrialHarness::new(&mut session, object, OrientationSampler::from_seed(5), settings(3));

    harness
        .run_sweep(&[0.0, 0.7, 2.5, 10.0], 3)
        .expect("sweep should succeed");

    let resets = log.resets();
    assert_eq!(resets.len(), 12);
    for pose in resets {
        assert_eq!(pose.position.x, 0.0);
        assert_eq!(pose.position.y, 0.0);
        assert!((pose.orientation.length() - 1.0).abs() < 1e-5);
    }
}

#[test]
fn zero_trials_never_touch_the_object() {
    let backend = ScriptedBackend::with_heights(vec![0.0]);
    let log = backend.call_log();
    let (mut session, object) = configured_session(backend);
    let mut harness = TrialHarness::new(
        &mut session,
        object,
        OrientationSampler::from_seed(1),
        HarnessSettings::default(),
    );

    let report = harness
        .run_sweep(&[1.0, 1.25, 1.5], 0)
        .expect("empty sweep should succeed");

    assert!(report.is_empty());
    assert!(log.resets().is_empty());
    assert_eq!(log.steps(), 0);
}

#[test]
fn empty_height_list_runs_nothing() {
    let (mut session, object) = configured_session(ScriptedBackend::default());
    let mut harness = TrialHarness::new(
        &mut session,
        object,
        OrientationSampler::from_seed(1),
        HarnessSettings::default(),
    );
    assert!(harness.run_sweep(&[], 4).unwrap().is_empty());
}

#[test]
fn counter_starts_at_150_and_stops_exactly_at_zero() {
    let backend = ScriptedBackend::with_heights(vec![0.0]);
    let log = backend.call_log();
    let (mut session, object) = configured_session(backend);
    let mut harness = TrialHarness::new(
        &mut session,
        object,
        OrientationSampler::from_seed(2),
        HarnessSettings::default(),
    );

    harness.run_sweep(&[1.0, 1.5], 2).unwrap();

    assert_eq!(log.steps_per_reset(), vec![150, 150, 150, 150]);
}

#[test]
fn steps_at_or_above_threshold_do_not_count() {
    // 10 steps in the air, 5 exactly on the threshold, then resting.
    let mut heights = vec![0.8; 10];
    heights.extend(std::iter::repeat(0.01).take(5));
    heights.push(0.002);

    let (mut session, object) = configured_session(ScriptedBackend::with_heights(heights));
    let mut harness = TrialHarness::new(
        &mut session,
        object,
        OrientationSampler::from_seed(2),
        HarnessSettings::default(),
    );
    let outcome = harness.run_trial(1.0, 0).unwrap();

    assert_eq!(outcome.steps, 15 + 150);
    assert!(outcome.settled);
}

#[test]
fn bounces_do_not_reset_the_counter() {
    // Dips below the threshold, bounces back up, dips again.
    let heights = vec![0.0, 0.5, 0.0, 0.5, 0.5, 0.0];
    let (mut session, object) = configured_session(ScriptedBackend::with_heights(heights));
    let mut harness =
        TrialHarness::new(&mut session, object, OrientationSampler::from_seed(4), settings(3));

    let outcome = harness.run_trial(1.0, 0).unwrap();

    assert_eq!(outcome.steps, 6);
    assert!(outcome.settled);
}

#[test]
fn free_fall_settles_after_touchdown_plus_counter() {
    let config = SimulationConfig::default();
    let (mut session, object) = configured_session(ScriptedBackend::new(Trajectory::FreeFall {
        rest_height: 0.0,
    }));
    let mut harness = TrialHarness::new(
        &mut session,
        object,
        OrientationSampler::from_seed(9),
        HarnessSettings::default(),
    );
    let outcome = harness.run_trial(1.0, 0).unwrap();

    // Steps until z < 0.01 under constant gravity, then 149 more.
    let dt = config.time_step;
    let g = -config.gravity.z;
    let touchdown = (1..)
        .find(|n: &u64| {
            let t = *n as f32 * dt;
            1.0 - 0.5 * g * t * t < 0.01
        })
        .unwrap();
    assert_eq!(outcome.steps, touchdown + 149);
    assert_eq!(outcome.final_pose.position.z, 0.0);
}

#[test]
fn velocity_is_queried_every_step() {
    let backend = ScriptedBackend::with_heights(vec![0.0]);
    let log = backend.call_log();
    let (mut session, object) = configured_session(backend);
    let mut harness =
        TrialHarness::new(&mut session, object, OrientationSampler::from_seed(4), settings(7));
    harness.run_trial(0.5, 0).unwrap();

    let velocity_queries = log.count(|call| matches!(call, BackendCall::QueryVelocity(_)));
    let pose_queries = log.count(|call| matches!(call, BackendCall::QueryPose(_)));
    assert_eq!(velocity_queries, 7);
    assert_eq!(pose_queries, 7);
}

#[test]
fn injected_step_failure_aborts_the_sweep() {
    let backend = ScriptedBackend::with_heights(vec![0.0]).failing_at_step(200);
    let log = backend.call_log();
    let (mut session, object) = configured_session(backend);
    let mut harness = TrialHarness::new(
        &mut session,
        object,
        OrientationSampler::from_seed(8),
        HarnessSettings::default(),
    );

    let err = harness
        .run_sweep(&[1.0, 1.25, 1.5], 1)
        .expect_err("failure at step 200 must abort");
    assert!(matches!(err, HarnessError::Backend(_)));
    assert!(err.to_string().contains("step 200"));

    // First trial completed (150 steps), second failed on its 50th step, third never started.
    let resets: Vec<f32> = log.resets().iter().map(|p| p.position.z).collect();
    assert_eq!(resets, vec![1.0, 1.25]);
    assert_eq!(log.steps(), 200);
}

#[test]
fn huge_trial_count_aborts_cleanly_on_first_failure() {
    let backend = ScriptedBackend::with_heights(vec![0.0]).failing_at_step(1);
    let log = backend.call_log();
    let (mut session, object) = configured_session(backend);
    let mut harness = TrialHarness::new(
        &mut session,
        object,
        OrientationSampler::from_seed(8),
        HarnessSettings::default(),
    );

    let err = harness
        .run_sweep(&[1.0, 1.25, 1.5], usize::MAX / 2)
        .expect_err("failure at step 1 must abort");
    assert!(matches!(err, HarnessError::Backend(_)));
    assert_eq!(log.steps(), 1);
    assert_eq!(log.resets().len(), 1);
}

#[test]
fn step_budget_ends_a_trial_without_failing_the_sweep() {
    let (mut session, object) = configured_session(ScriptedBackend::with_heights(vec![0.3]));
    let settings = HarnessSettings {
        max_steps_per_trial: Some(25),
        ..HarnessSettings::default()
    };
    let mut harness =
        TrialHarness::new(&mut session, object, OrientationSampler::from_seed(8), settings);

    let report = harness.run_sweep(&[1.0, 2.0], 1).unwrap();
    assert_eq!(report.len(), 2);
    assert_eq!(report.unsettled(), 2);
    assert_eq!(report.total_steps(), 50);
}

#[test]
fn seeded_harnesses_sample_identical_orientations() {
    let run = || {
        let (mut session, object) = configured_session(ScriptedBackend::with_heights(vec![0.0]));
        let mut harness =
            TrialHarness::new(&mut session, object, OrientationSampler::from_seed(77), settings(1));
        harness.run_sweep(&[1.0, 1.25, 1.5], 2).unwrap()
    };
    let a = run();
    let b = run();
    let orientations = |r: &SweepReport| r.trials.iter().map(|t| t.orientation).collect::<Vec<_>>();
    assert_eq!(orientations(&a), orientations(&b));
}
