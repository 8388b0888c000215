//! The physics backend seam.
//!
//! Everything the harness needs from a physics engine goes through
//! [`PhysicsBackend`]. The engine itself (integration, collision, contacts)
//! stays behind the trait.

#[cfg(feature = "rapier")]
pub mod rapier;
pub mod scripted;

#[cfg(feature = "rapier")]
pub use rapier::RapierBackend;
pub use scripted::{BackendCall, CallLog, ScriptedBackend, Trajectory};

use std::path::Path;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::{
    core::types::{BodyHandle, BodyMaterial, Pose, Velocity},
    error::Result,
};

/// How the backend is driven.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Interactive: a human may be watching, steps are paced to real time.
    Gui,
    /// Headless: run as fast as possible.
    #[default]
    Direct,
}

impl ConnectionMode {
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Gui)
    }
}

/// Options applied when a model is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub base_position: Vec3,
    pub base_orientation: Quat,
    /// Pin the body in place (the ground plane).
    pub use_fixed_base: bool,
    /// Take mass and inertia from the model file instead of computing them from the shapes.
    pub use_inertia_from_file: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            base_position: Vec3::ZERO,
            base_orientation: Quat::IDENTITY,
            use_fixed_base: false,
            use_inertia_from_file: false,
        }
    }
}

impl LoadOptions {
    pub fn fixed() -> Self {
        Self {
            use_fixed_base: true,
            ..Self::default()
        }
    }

    pub fn with_inertia_from_file() -> Self {
        Self {
            use_inertia_from_file: true,
            ..Self::default()
        }
    }
}

/// Trait implemented by physics engines the harness can drive.
///
/// Calls other than [`connect`](Self::connect) and
/// [`is_connected`](Self::is_connected) may assume a live connection; the
/// session checks that before forwarding.
pub trait PhysicsBackend {
    fn name(&self) -> &str;

    fn connect(&mut self, mode: ConnectionMode) -> Result<()>;

    fn is_connected(&self) -> bool;

    fn set_time_step(&mut self, time_step: f32) -> Result<()>;

    fn set_gravity(&mut self, gravity: Vec3) -> Result<()>;

    /// Directory consulted for relative model paths. `None` restores the built-in data.
    fn set_search_path(&mut self, path: Option<&Path>) -> Result<()>;

    fn load_body(&mut self, path: &Path, options: &LoadOptions) -> Result<BodyHandle>;

    /// Applies the properties set in `update`; absent ones keep their current value.
    fn change_dynamics(&mut self, body: BodyHandle, update: &BodyMaterial) -> Result<()>;

    /// Teleports the body and zeroes its velocity.
    fn reset_base_pose(&mut self, body: BodyHandle, pose: Pose) -> Result<()>;

    /// Advances the simulation by one fixed timestep.
    fn step_simulation(&mut self) -> Result<()>;

    fn base_pose(&self, body: BodyHandle) -> Result<Pose>;

    fn base_velocity(&self, body: BodyHandle) -> Result<Velocity>;

    fn disconnect(&mut self) -> Result<()>;
}

impl<B: PhysicsBackend + ?Sized> PhysicsBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn connect(&mut self, mode: ConnectionMode) -> Result<()> {
        (**self).connect(mode)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn set_time_step(&mut self, time_step: f32) -> Result<()> {
        (**self).set_time_step(time_step)
    }

    fn set_gravity(&mut self, gravity: Vec3) -> Result<()> {
        (**self).set_gravity(gravity)
    }

    fn set_search_path(&mut self, path: Option<&Path>) -> Result<()> {
        (**self).set_search_path(path)
    }

    fn load_body(&mut self, path: &Path, options: &LoadOptions) -> Result<BodyHandle> {
        (**self).load_body(path, options)
    }

    fn change_dynamics(&mut self, body: BodyHandle, update: &BodyMaterial) -> Result<()> {
        (**self).change_dynamics(body, update)
    }

    fn reset_base_pose(&mut self, body: BodyHandle, pose: Pose) -> Result<()> {
        (**self).reset_base_pose(body, pose)
    }

    fn step_simulation(&mut self) -> Result<()> {
        (**self).step_simulation()
    }

    fn base_pose(&self, body: BodyHandle) -> Result<Pose> {
        (**self).base_pose(body)
    }

    fn base_velocity(&self, body: BodyHandle) -> Result<Velocity> {
        (**self).base_velocity(body)
    }

    fn disconnect(&mut self) -> Result<()> {
        (**self).disconnect()
    }
}
