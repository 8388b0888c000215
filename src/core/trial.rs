//! Per-trial state: the drop pose and the settling counter.

use std::f32::consts::TAU;

use glam::{Quat, Vec3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    config::{DEFAULT_SETTLE_STEPS, DEFAULT_SETTLE_THRESHOLD},
    core::types::Pose,
    utils::math::quat_from_euler,
};

/// Roll, pitch and yaw in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EulerAngles {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl EulerAngles {
    pub fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self { roll, pitch, yaw }
    }

    pub fn to_quat(&self) -> Quat {
        quat_from_euler(self.roll, self.pitch, self.yaw)
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.roll, self.pitch, self.yaw]
    }
}

/// Draws drop orientations, each angle independently uniform on `[0, 2π)`.
#[derive(Debug, Clone)]
pub struct OrientationSampler {
    rng: StdRng,
}

impl OrientationSampler {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded when `seed` is given, OS entropy otherwise.
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::from_seed(seed),
            None => Self::from_entropy(),
        }
    }

    pub fn sample(&mut self) -> EulerAngles {
        EulerAngles {
            roll: self.sample_angle(),
            pitch: self.sample_angle(),
            yaw: self.sample_angle(),
        }
    }

    fn sample_angle(&mut self) -> f32 {
        let angle = self.rng.gen_range(0.0..TAU);
        // f32 rounding can land exactly on the open upper bound.
        if angle >= TAU {
            0.0
        } else {
            angle
        }
    }
}

/// One drop: fixed horizontal origin, requested height, random orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropTrial {
    pub height: f32,
    pub index: usize,
    pub euler: EulerAngles,
}

impl DropTrial {
    pub fn new(height: f32, index: usize, euler: EulerAngles) -> Self {
        Self {
            height,
            index,
            euler,
        }
    }

    pub fn sample(height: f32, index: usize, sampler: &mut OrientationSampler) -> Self {
        Self::new(height, index, sampler.sample())
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.height)
    }

    pub fn initial_pose(&self) -> Pose {
        Pose::new(self.position(), self.euler.to_quat())
    }
}

/// Cumulative settling counter.
///
/// Every observation strictly below the threshold consumes one step of the
/// budget. Observations at or above it leave the counter untouched, so the
/// steps need not be consecutive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettlingState {
    remaining: u32,
    threshold: f32,
}

impl Default for SettlingState {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_STEPS, DEFAULT_SETTLE_THRESHOLD)
    }
}

impl SettlingState {
    pub fn new(steps: u32, threshold: f32) -> Self {
        Self {
            remaining: steps,
            threshold,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn is_settled(&self) -> bool {
        self.remaining == 0
    }

    /// Records one step's height. Returns `true` if the counter moved.
    pub fn observe(&mut self, height: f32) -> bool {
        if self.remaining > 0 && height < self.threshold {
            self.remaining -= 1;
            true
        } else {
            false
        }
    }
}
