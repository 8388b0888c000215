//! Drop-and-settle trial harness.

use std::fmt;
use std::thread;
use std::time::Duration;

use log::{debug, info, log_enabled, trace, warn, Level};
use serde::{Deserialize, Serialize};

use crate::{
    backend::PhysicsBackend,
    config::{HarnessConfig, DEFAULT_SETTLE_STEPS, DEFAULT_SETTLE_THRESHOLD},
    core::{
        trial::{DropTrial, EulerAngles, OrientationSampler, SettlingState},
        types::{BodyHandle, Pose, Velocity},
    },
    error::Result,
    session::EngineSession,
    utils::{
        logging::{warn_if_behind_real_time, ScopedTimer},
        math::euler_from_quat,
    },
};

const MAX_PREALLOCATED_TRIALS: usize = 1024;

/// Knobs of the stepping loop.
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessSettings {
    pub settle_steps: u32,
    pub settle_threshold: f32,
    /// Stop a trial after this many steps even if it has not settled.
    pub max_steps_per_trial: Option<u64>,
    /// Sleep between steps. `None` runs as fast as the backend allows.
    pub step_delay: Option<Duration>,
    /// Log every step's pose at `info` level so a drop can be followed live.
    pub watch: bool,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            settle_steps: DEFAULT_SETTLE_STEPS,
            settle_threshold: DEFAULT_SETTLE_THRESHOLD,
            max_steps_per_trial: None,
            step_delay: None,
            watch: false,
        }
    }
}

impl HarnessSettings {
    /// Pacing and per-step pose logging are only enabled for interactive sessions.
    pub fn from_config(config: &HarnessConfig) -> Self {
        let interactive = config.mode.is_interactive();
        let step_delay = if interactive && config.step_delay > 0.0 {
            Duration::try_from_secs_f32(config.step_delay).ok()
        } else {
            None
        };
        Self {
            settle_steps: config.settle.steps,
            settle_threshold: config.settle.threshold,
            max_steps_per_trial: config.settle.max_steps_per_trial,
            step_delay,
            watch: interactive,
        }
    }
}

/// What happened during one trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub height: f32,
    pub index: usize,
    pub orientation: EulerAngles,
    pub steps: u64,
    /// `false` when the step budget ran out before the counter reached zero.
    pub settled: bool,
    pub final_pose: Pose,
    pub final_velocity: Velocity,
}

/// Outcomes of a sweep, height-major then trial-minor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub trials: Vec<TrialOutcome>,
}

impl SweepReport {
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn total_steps(&self) -> u64 {
        self.trials.iter().map(|t| t.steps).sum()
    }

    pub fn unsettled(&self) -> usize {
        self.trials.iter().filter(|t| !t.settled).count()
    }

    pub fn heights(&self) -> Vec<f32> {
        self.trials.iter().map(|t| t.height).collect()
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Drop Sweep ---")?;
        writeln!(
            f,
            "{:>8} {:>5} {:>8} {:>8} {:>9} {:>9} {:>9}",
            "height", "trial", "steps", "settled", "x", "y", "z"
        )?;
        for trial in &self.trials {
            let p = trial.final_pose.position;
            writeln!(
                f,
                "{:>8.3} {:>5} {:>8} {:>8} {:>9.4} {:>9.4} {:>9.4}",
                trial.height,
                trial.index,
                trial.steps,
                if trial.settled { "yes" } else { "no" },
                p.x,
                p.y,
                p.z
            )?;
        }
        writeln!(
            f,
            "Trials: {}, Steps: {}, Unsettled: {}",
            self.len(),
            self.total_steps(),
            self.unsettled()
        )?;
        write!(f, "------------------")
    }
}

/// Runs drop trials against the object body of a session.
pub struct TrialHarness<'s, B: PhysicsBackend> {
    session: &'s mut EngineSession<B>,
    object: BodyHandle,
    sampler: OrientationSampler,
    settings: HarnessSettings,
}

impl<'s, B: PhysicsBackend> TrialHarness<'s, B> {
    pub fn new(
        session: &'s mut EngineSession<B>,
        object: BodyHandle,
        sampler: OrientationSampler,
        settings: HarnessSettings,
    ) -> Self {
        Self {
            session,
            object,
            sampler,
            settings,
        }
    }

    pub fn settings(&self) -> &HarnessSettings {
        &self.settings
    }

    /// Drops the object once from `height` and steps until it settles.
    ///
    /// Any backend error aborts the trial and is returned as-is.
    pub fn run_trial(&mut self, height: f32, index: usize) -> Result<TrialOutcome> {
        let trial = DropTrial::sample(height, index, &mut self.sampler);
        let timer = ScopedTimer::new(format!("trial h={height:.3} #{index}"));

        self.session.reset_pose(self.object, trial.initial_pose())?;
        debug!(
            "trial h={height:.3} #{index}: rpy = {:?}",
            trial.euler.to_array()
        );

        let mut settling =
            SettlingState::new(self.settings.settle_steps, self.settings.settle_threshold);
        let mut steps: u64 = 0;
        let mut pose = trial.initial_pose();
        let mut velocity = Velocity::default();

        while !settling.is_settled() {
            if self
                .settings
                .max_steps_per_trial
                .is_some_and(|budget| steps >= budget)
            {
                break;
            }

            self.session.step()?;
            steps += 1;
            velocity = self.session.velocity(self.object)?;
            pose = self.session.pose(self.object)?;
            settling.observe(pose.height());

            if self.settings.watch {
                let [roll, pitch, yaw] = euler_from_quat(pose.orientation);
                info!(
                    "h={height:.3} #{index} step {steps}: xyz = ({:.4}, {:.4}, {:.4}), rpy = ({roll:.3}, {pitch:.3}, {yaw:.3}), |v| = {:.4}",
                    pose.position.x,
                    pose.position.y,
                    pose.position.z,
                    velocity.linear.length()
                );
            } else if log_enabled!(Level::Trace) {
                trace!(
                    "step {steps}: z = {:.5}, vz = {:.4}, remaining = {}",
                    pose.height(),
                    velocity.linear.z,
                    settling.remaining()
                );
            }

            if let Some(delay) = self.settings.step_delay {
                thread::sleep(delay);
            }
        }

        let settled = settling.is_settled();
        if !settled {
            warn!(
                "trial h={height:.3} #{index} hit the step budget after {steps} steps ({} sub-threshold steps left)",
                settling.remaining()
            );
        }
        if self.settings.step_delay.is_some() {
            let dt = self.session.config().map_or(0.0, |c| c.time_step);
            if let Ok(simulated) = Duration::try_from_secs_f32(dt * steps as f32) {
                warn_if_behind_real_time(
                    &format!("trial h={height:.3} #{index}"),
                    timer.elapsed(),
                    simulated,
                );
            }
        }

        Ok(TrialOutcome {
            height,
            index,
            orientation: trial.euler,
            steps,
            settled,
            final_pose: pose,
            final_velocity: velocity,
        })
    }

    /// Runs `trials_per_height` trials at every height, in the given order.
    ///
    /// Stops at the first error; trials after the failing one never run.
    pub fn run_sweep(&mut self, heights: &[f32], trials_per_height: usize) -> Result<SweepReport> {
        let _timer = ScopedTimer::new(format!(
            "sweep of {} height(s) x {trials_per_height}",
            heights.len()
        ));
        info!(
            "sweeping {} height(s), {trials_per_height} trial(s) each",
            heights.len()
        );

        let mut report = SweepReport {
            trials: Vec::with_capacity(
                heights
                    .len()
                    .saturating_mul(trials_per_height)
                    .min(MAX_PREALLOCATED_TRIALS),
            ),
        };
        for &height in heights {
            for index in 0..trials_per_height {
                let outcome = self.run_trial(height, index)?;
                debug!(
                    "trial h={height:.3} #{index} finished after {} steps (settled: {})",
                    outcome.steps, outcome.settled
                );
                report.trials.push(outcome);
            }
        }

        info!(
            "sweep finished: {} trial(s), {} step(s)",
            report.len(),
            report.total_steps()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::{ConnectionMode, LoadOptions, ScriptedBackend},
        config::SimulationConfig,
    };

    fn session_with(backend: ScriptedBackend) -> (EngineSession<ScriptedBackend>, BodyHandle) {
        let mut session = EngineSession::initialize(backend, ConnectionMode::Direct).unwrap();
        session.configure(&SimulationConfig::default()).unwrap();
        let object = session
            .load_body("object.urdf", &LoadOptions::with_inertia_from_file())
            .unwrap();
        (session, object)
    }

    #[test]
    fn resting_object_settles_after_exactly_the_counter() {
        let (mut session, object) = session_with(ScriptedBackend::with_heights(vec![0.0]));
        let mut harness = TrialHarness::new(
            &mut session,
            object,
            OrientationSampler::from_seed(3),
            HarnessSettings::default(),
        );
        let outcome = harness.run_trial(1.0, 0).unwrap();
        assert_eq!(outcome.steps, 150);
        assert!(outcome.settled);
    }

    #[test]
    fn budget_stops_a_hovering_object() {
        let (mut session, object) = session_with(ScriptedBackend::with_heights(vec![0.5]));
        let settings = HarnessSettings {
            max_steps_per_trial: Some(40),
            ..HarnessSettings::default()
        };
        let mut harness =
            TrialHarness::new(&mut session, object, OrientationSampler::from_seed(3), settings);
        let outcome = harness.run_trial(1.0, 0).unwrap();
        assert_eq!(outcome.steps, 40);
        assert!(!outcome.settled);
    }

    #[test]
    fn settings_from_config_pace_only_interactive_runs() {
        let mut config = HarnessConfig::default();
        assert_eq!(HarnessSettings::from_config(&config).step_delay, None);

        assert!(!HarnessSettings::from_config(&config).watch);

        config.mode = ConnectionMode::Gui;
        let settings = HarnessSettings::from_config(&config);
        assert!(settings.step_delay.is_some());
        assert!(settings.watch);
        assert_eq!(settings.settle_steps, 150);
    }

    #[test]
    fn unrepresentable_delay_disables_pacing() {
        let mut config = HarnessConfig::default();
        config.mode = ConnectionMode::Gui;
        config.step_delay = 1e20;
        assert_eq!(HarnessSettings::from_config(&config).step_delay, None);
    }

    #[test]
    fn negative_time_step_does_not_break_pacing_report() {
        let mut session =
            EngineSession::initialize(ScriptedBackend::with_heights(vec![0.0]), ConnectionMode::Gui)
                .unwrap();
        session
            .configure(&SimulationConfig {
                time_step: -1.0 / 480.0,
                ..SimulationConfig::default()
            })
            .unwrap();
        let object = session
            .load_body("object.urdf", &LoadOptions::default())
            .unwrap();
        let settings = HarnessSettings {
            step_delay: Some(Duration::from_nanos(1)),
            watch: true,
            ..HarnessSettings::default()
        };
        let mut harness =
            TrialHarness::new(&mut session, object, OrientationSampler::from_seed(6), settings);
        let outcome = harness.run_trial(1.0, 0).unwrap();
        assert_eq!(outcome.steps, 150);
    }

    #[test]
    fn report_display_lists_every_trial() {
        let (mut session, object) = session_with(ScriptedBackend::with_heights(vec![0.0]));
        let mut harness = TrialHarness::new(
            &mut session,
            object,
            OrientationSampler::from_seed(5),
            HarnessSettings::default(),
        );
        let report = harness.run_sweep(&[1.0, 2.0], 2).unwrap();
        let text = report.to_string();
        assert_eq!(text.lines().count(), 2 + 4 + 2);
        assert!(text.contains("Trials: 4, Steps: 600, Unsettled: 0"));
    }
}
