//! Drop Settle – drop-and-settle trials over a rigid-body physics backend.
//!
//! A session connects to a backend, configures timestep, gravity and
//! materials, and loads a falling object plus a ground plane. The harness then
//! drops the object from a grid of heights with random orientations and steps
//! the simulation until a cumulative settling counter runs out.

pub mod backend;
pub mod config;
pub mod core;
pub mod error;
pub mod harness;
pub mod model;
pub mod session;
pub mod utils;

pub use glam::{Quat, Vec3};

#[cfg(feature = "rapier")]
pub use backend::RapierBackend;
pub use backend::{
    BackendCall, CallLog, ConnectionMode, LoadOptions, PhysicsBackend, ScriptedBackend,
    Trajectory,
};
pub use config::{BodyConfig, HarnessConfig, SceneConfig, SettleConfig, SimulationConfig, SweepConfig};
pub use core::{
    trial::{DropTrial, EulerAngles, OrientationSampler, SettlingState},
    types::{BodyHandle, BodyMaterial, Pose, Velocity},
};
pub use error::{HarnessError, Result};
pub use harness::{HarnessSettings, SweepReport, TrialHarness, TrialOutcome};
pub use session::{DropScene, EngineSession};

/// Runs a complete sweep described by `config` on `backend`.
///
/// Connects, configures, loads the scene, sweeps, and tears the session down.
/// On error the session is still disconnected when it goes out of scope.
pub fn run_sweep<B: PhysicsBackend>(backend: B, config: &HarnessConfig) -> Result<SweepReport> {
    config.validate()?;

    let mut session = EngineSession::initialize(backend, config.mode)?;
    session.configure(&config.simulation)?;
    let scene = DropScene::setup(&mut session, &config.scene)?;

    let report = {
        let mut harness = TrialHarness::new(
            &mut session,
            scene.object,
            OrientationSampler::new(config.sweep.seed),
            HarnessSettings::from_config(config),
        );
        harness.run_sweep(&config.sweep.heights(), config.sweep.trials_per_height)?
    };

    session.teardown()?;
    Ok(report)
}
