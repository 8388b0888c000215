//! Defaults and serializable configuration for a drop-and-settle run.

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{
    backend::ConnectionMode,
    core::types::BodyMaterial,
    error::{HarnessError, Result},
    model::assets::BUILTIN_PLANE,
    utils::math::linspace,
};

/// Default gravity vector applied in the simulation (Z-up).
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, 0.0, -9.81];

/// Default integration timestep (in seconds).
pub const DEFAULT_TIME_STEP: f32 = 1.0 / 480.0;

/// Declared sample frequency in Hz. Not consulted by the stepping loop.
pub const DEFAULT_SAMPLE_FREQUENCY_HZ: f32 = 1000.0;

/// Number of sub-threshold steps after which a trial counts as settled.
pub const DEFAULT_SETTLE_STEPS: u32 = 150;

/// Height below which a step counts towards settling.
pub const DEFAULT_SETTLE_THRESHOLD: f32 = 0.01;

/// Real-time pacing delay between steps in interactive mode (seconds).
pub const DEFAULT_STEP_DELAY: f32 = 1.0 / 4800.0;

/// Longest accepted pacing delay between steps (seconds).
pub const MAX_STEP_DELAY: f32 = 1.0;

/// Lowest drop height of the reference sweep (meters).
pub const DEFAULT_HEIGHT_START: f32 = 1.0;

/// Highest drop height of the reference sweep (meters).
pub const DEFAULT_HEIGHT_END: f32 = 1.5;

/// Number of evenly spaced heights in the reference sweep.
pub const DEFAULT_HEIGHT_COUNT: usize = 3;

/// Trials run at every height of the reference sweep.
pub const DEFAULT_TRIALS_PER_HEIGHT: usize = 1;

/// Falling object model used when nothing else is configured.
pub const DEFAULT_OBJECT_MODEL: &str = "assets/thingy53/thingy53.urdf";

/// Global simulation parameters pushed to the backend once per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub time_step: f32,
    pub gravity: Vec3,
    pub sample_frequency_hz: f32,
    /// Extra directory searched for models. `None` uses the backend's built-in data.
    pub search_path: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            time_step: DEFAULT_TIME_STEP,
            gravity: Vec3::from_array(DEFAULT_GRAVITY),
            sample_frequency_hz: DEFAULT_SAMPLE_FREQUENCY_HZ,
            search_path: None,
        }
    }
}

/// How one body of the scene is loaded and which material it receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyConfig {
    pub model: PathBuf,
    pub use_inertia_from_file: bool,
    pub use_fixed_base: bool,
    pub material: BodyMaterial,
}

impl BodyConfig {
    /// Reference falling object: inertia from file, low friction, mild bounce.
    pub fn reference_object() -> Self {
        Self {
            model: PathBuf::from(DEFAULT_OBJECT_MODEL),
            use_inertia_from_file: true,
            use_fixed_base: false,
            material: BodyMaterial {
                linear_damping: Some(0.1),
                angular_damping: Some(0.02),
                lateral_friction: Some(0.001),
                rolling_friction: Some(0.001),
                spinning_friction: Some(0.001),
                restitution: Some(0.3),
            },
        }
    }

    /// Reference ground plane from the backend's built-in assets.
    pub fn reference_plane() -> Self {
        Self {
            model: PathBuf::from(BUILTIN_PLANE),
            use_inertia_from_file: false,
            use_fixed_base: true,
            material: BodyMaterial {
                linear_damping: Some(0.01),
                angular_damping: Some(0.02),
                restitution: Some(0.4),
                ..BodyMaterial::default()
            },
        }
    }
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self::reference_object()
    }
}

/// The two bodies of a drop scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub object: BodyConfig,
    pub plane: BodyConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            object: BodyConfig::reference_object(),
            plane: BodyConfig::reference_plane(),
        }
    }
}

/// Parameters of the settling heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleConfig {
    pub steps: u32,
    pub threshold: f32,
    /// Upper bound on steps per trial. `None` steps until settled.
    pub max_steps_per_trial: Option<u64>,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            steps: DEFAULT_SETTLE_STEPS,
            threshold: DEFAULT_SETTLE_THRESHOLD,
            max_steps_per_trial: None,
        }
    }
}

/// Height grid and trial count of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub height_start: f32,
    pub height_end: f32,
    pub height_count: usize,
    /// Explicit heights. Takes precedence over the evenly spaced grid.
    pub heights: Option<Vec<f32>>,
    pub trials_per_height: usize,
    pub seed: Option<u64>,
}

impl SweepConfig {
    /// Heights to sweep, in order.
    pub fn heights(&self) -> Vec<f32> {
        match &self.heights {
            Some(explicit) => explicit.clone(),
            None => linspace(self.height_start, self.height_end, self.height_count),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            height_start: DEFAULT_HEIGHT_START,
            height_end: DEFAULT_HEIGHT_END,
            height_count: DEFAULT_HEIGHT_COUNT,
            heights: None,
            trials_per_height: DEFAULT_TRIALS_PER_HEIGHT,
            seed: None,
        }
    }
}

/// Everything a full run needs. `Default` reproduces the reference sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub mode: ConnectionMode,
    /// Pacing delay between steps in interactive mode. Ignored when headless.
    pub step_delay: f32,
    pub simulation: SimulationConfig,
    pub scene: SceneConfig,
    pub settle: SettleConfig,
    pub sweep: SweepConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            mode: ConnectionMode::Direct,
            step_delay: DEFAULT_STEP_DELAY,
            simulation: SimulationConfig::default(),
            scene: SceneConfig::default(),
            settle: SettleConfig::default(),
            sweep: SweepConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Parses a TOML document. Missing tables and keys fall back to defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|err| HarnessError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        if !(sim.time_step.is_finite() && sim.time_step > 0.0) {
            return Err(HarnessError::Config(format!(
                "time_step must be positive, got {}",
                sim.time_step
            )));
        }
        if !sim.gravity.is_finite() {
            return Err(HarnessError::Config("gravity must be finite".into()));
        }
        if self.settle.steps == 0 {
            return Err(HarnessError::Config("settle.steps must be at least 1".into()));
        }
        if !self.settle.threshold.is_finite() {
            return Err(HarnessError::Config("settle.threshold must be finite".into()));
        }
        if !(0.0..=MAX_STEP_DELAY).contains(&self.step_delay) {
            return Err(HarnessError::Config(format!(
                "step_delay must be within [0, {MAX_STEP_DELAY}] s, got {}",
                self.step_delay
            )));
        }

        let sweep = &self.sweep;
        match &sweep.heights {
            Some(heights) => {
                if heights.iter().any(|h| !h.is_finite()) {
                    return Err(HarnessError::Config("heights must be finite".into()));
                }
            }
            None => {
                if sweep.height_count == 0 {
                    return Err(HarnessError::Config("sweep.height_count must be at least 1".into()));
                }
                if sweep.height_end < sweep.height_start {
                    return Err(HarnessError::Config(format!(
                        "sweep range is inverted: {} > {}",
                        sweep.height_start, sweep.height_end
                    )));
                }
            }
        }
        Ok(())
    }
}
