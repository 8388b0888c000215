//! Engine-free backend that replays a scripted vertical trajectory.
//!
//! Every call is appended to a shared [`CallLog`] so tests can check what the
//! session and harness asked for, even after the backend has been dropped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::Vec3;
use log::{debug, trace};
use parking_lot::Mutex;

use super::{ConnectionMode, LoadOptions, PhysicsBackend};
use crate::{
    config::{DEFAULT_GRAVITY, DEFAULT_TIME_STEP},
    core::types::{BodyHandle, BodyMaterial, Pose, Velocity},
    error::{HarnessError, Result},
};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Connect(ConnectionMode),
    SetTimeStep(f32),
    SetGravity(Vec3),
    SetSearchPath(Option<PathBuf>),
    LoadBody(PathBuf),
    ChangeDynamics(BodyHandle, BodyMaterial),
    ResetPose(BodyHandle, Pose),
    Step,
    QueryPose(BodyHandle),
    QueryVelocity(BodyHandle),
    Disconnect,
}

/// Shared, cloneable view of the calls made on a [`ScriptedBackend`].
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<BackendCall>>>,
}

impl CallLog {
    fn push(&self, call: BackendCall) {
        self.calls.lock().push(call);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    pub fn count(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    pub fn steps(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::Step))
    }

    pub fn disconnects(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::Disconnect))
    }

    /// Poses passed to `reset_base_pose`, in call order.
    pub fn resets(&self) -> Vec<Pose> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                BackendCall::ResetPose(_, pose) => Some(*pose),
                _ => None,
            })
            .collect()
    }

    /// Number of steps between consecutive resets (and after the last one).
    pub fn steps_per_reset(&self) -> Vec<usize> {
        let mut runs = Vec::new();
        for call in self.calls.lock().iter() {
            match call {
                BackendCall::ResetPose(..) => runs.push(0),
                BackendCall::Step => {
                    if let Some(last) = runs.last_mut() {
                        *last += 1;
                    }
                }
                _ => {}
            }
        }
        runs
    }
}

/// Vertical motion the scripted backend plays back after every pose reset.
#[derive(Debug, Clone, PartialEq)]
pub enum Trajectory {
    /// Free fall from the reset height under the configured gravity, then rest.
    FreeFall { rest_height: f32 },
    /// Heights reported after the 1st, 2nd, ... step; the last value repeats.
    Sequence(Vec<f32>),
}

impl Default for Trajectory {
    fn default() -> Self {
        Self::FreeFall { rest_height: 0.0 }
    }
}

#[derive(Debug, Clone)]
struct ScriptedBody {
    fixed: bool,
    pose: Pose,
    velocity: Velocity,
    material: BodyMaterial,
    drop_height: f32,
    elapsed_steps: u64,
}

/// Deterministic stand-in for a physics engine.
#[derive(Debug)]
pub struct ScriptedBackend {
    trajectory: Trajectory,
    mode: Option<ConnectionMode>,
    time_step: f32,
    gravity: Vec3,
    search_path: Option<PathBuf>,
    bodies: Vec<ScriptedBody>,
    total_steps: u64,
    fail_connect: bool,
    fail_at_step: Option<u64>,
    rejected_models: Vec<PathBuf>,
    log: CallLog,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new(Trajectory::default())
    }
}

impl ScriptedBackend {
    pub fn new(trajectory: Trajectory) -> Self {
        Self {
            trajectory,
            mode: None,
            time_step: DEFAULT_TIME_STEP,
            gravity: Vec3::from_array(DEFAULT_GRAVITY),
            search_path: None,
            bodies: Vec::new(),
            total_steps: 0,
            fail_connect: false,
            fail_at_step: None,
            rejected_models: Vec::new(),
            log: CallLog::default(),
        }
    }

    /// Backend whose every trial reports the given heights.
    pub fn with_heights(heights: impl Into<Vec<f32>>) -> Self {
        Self::new(Trajectory::Sequence(heights.into()))
    }

    /// Makes `connect` fail.
    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Makes the `step`-th call to `step_simulation` (1-based, counted over the
    /// backend's lifetime) fail.
    pub fn failing_at_step(mut self, step: u64) -> Self {
        self.fail_at_step = Some(step);
        self
    }

    /// Makes `load_body` fail for `path`.
    pub fn rejecting_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.rejected_models.push(path.into());
        self
    }

    pub fn call_log(&self) -> CallLog {
        self.log.clone()
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    pub fn time_step(&self) -> f32 {
        self.time_step
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    pub fn search_path(&self) -> Option<&Path> {
        self.search_path.as_deref()
    }

    /// Effective material of a body after all `change_dynamics` calls.
    pub fn material(&self, body: BodyHandle) -> Option<BodyMaterial> {
        self.bodies.get(body.index()).map(|b| b.material)
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.mode.is_some() {
            Ok(())
        } else {
            Err(HarnessError::NotConnected)
        }
    }

    fn body(&self, handle: BodyHandle) -> Result<&ScriptedBody> {
        self.bodies
            .get(handle.index())
            .ok_or(HarnessError::UnknownBody(handle))
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut ScriptedBody> {
        self.bodies
            .get_mut(handle.index())
            .ok_or(HarnessError::UnknownBody(handle))
    }

    fn advance(&self, body: &mut ScriptedBody) {
        body.elapsed_steps += 1;
        let previous = body.pose.position.z;
        let height = match &self.trajectory {
            Trajectory::FreeFall { rest_height } => {
                let t = body.elapsed_steps as f32 * self.time_step;
                (body.drop_height + 0.5 * self.gravity.z * t * t).max(*rest_height)
            }
            Trajectory::Sequence(heights) => {
                let index = (body.elapsed_steps as usize - 1).min(heights.len().saturating_sub(1));
                heights.get(index).copied().unwrap_or(previous)
            }
        };
        body.pose.position.z = height;
        body.velocity.linear = Vec3::new(0.0, 0.0, (height - previous) / self.time_step);
    }
}

impl PhysicsBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn connect(&mut self, mode: ConnectionMode) -> Result<()> {
        self.log.push(BackendCall::Connect(mode));
        if self.fail_connect {
            return Err(HarnessError::connection(self.name(), "connection refused"));
        }
        self.mode = Some(mode);
        debug!("scripted backend connected ({mode:?})");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.mode.is_some()
    }

    fn set_time_step(&mut self, time_step: f32) -> Result<()> {
        self.log.push(BackendCall::SetTimeStep(time_step));
        self.ensure_connected()?;
        self.time_step = time_step;
        Ok(())
    }

    fn set_gravity(&mut self, gravity: Vec3) -> Result<()> {
        self.log.push(BackendCall::SetGravity(gravity));
        self.ensure_connected()?;
        self.gravity = gravity;
        Ok(())
    }

    fn set_search_path(&mut self, path: Option<&Path>) -> Result<()> {
        self.log
            .push(BackendCall::SetSearchPath(path.map(Path::to_path_buf)));
        self.ensure_connected()?;
        self.search_path = path.map(Path::to_path_buf);
        Ok(())
    }

    fn load_body(&mut self, path: &Path, options: &LoadOptions) -> Result<BodyHandle> {
        self.log.push(BackendCall::LoadBody(path.to_path_buf()));
        self.ensure_connected()?;
        if self.rejected_models.iter().any(|rejected| rejected == path) {
            return Err(HarnessError::model_load(path, "rejected by scripted backend"));
        }

        let handle = BodyHandle::from_index(self.bodies.len() as u32);
        self.bodies.push(ScriptedBody {
            fixed: options.use_fixed_base,
            pose: Pose::new(options.base_position, options.base_orientation),
            velocity: Velocity::default(),
            material: BodyMaterial::default(),
            drop_height: options.base_position.z,
            elapsed_steps: 0,
        });
        Ok(handle)
    }

    fn change_dynamics(&mut self, body: BodyHandle, update: &BodyMaterial) -> Result<()> {
        self.log.push(BackendCall::ChangeDynamics(body, *update));
        self.ensure_connected()?;
        let body = self.body_mut(body)?;
        body.material = body.material.merged_with(update);
        Ok(())
    }

    fn reset_base_pose(&mut self, body: BodyHandle, pose: Pose) -> Result<()> {
        self.log.push(BackendCall::ResetPose(body, pose));
        self.ensure_connected()?;
        let body = self.body_mut(body)?;
        body.pose = pose;
        body.velocity = Velocity::default();
        body.drop_height = pose.position.z;
        body.elapsed_steps = 0;
        Ok(())
    }

    fn step_simulation(&mut self) -> Result<()> {
        self.log.push(BackendCall::Step);
        self.ensure_connected()?;
        let step = self.total_steps + 1;
        if self.fail_at_step == Some(step) {
            return Err(HarnessError::backend(format!(
                "injected failure at step {step}"
            )));
        }
        self.total_steps = step;

        let mut bodies = std::mem::take(&mut self.bodies);
        for body in bodies.iter_mut().filter(|b| !b.fixed) {
            self.advance(body);
        }
        self.bodies = bodies;
        trace!("scripted step {step}");
        Ok(())
    }

    fn base_pose(&self, body: BodyHandle) -> Result<Pose> {
        self.log.push(BackendCall::QueryPose(body));
        self.ensure_connected()?;
        Ok(self.body(body)?.pose)
    }

    fn base_velocity(&self, body: BodyHandle) -> Result<Velocity> {
        self.log.push(BackendCall::QueryVelocity(body));
        self.ensure_connected()?;
        Ok(self.body(body)?.velocity)
    }

    fn disconnect(&mut self) -> Result<()> {
        self.log.push(BackendCall::Disconnect);
        self.ensure_connected()?;
        self.mode = None;
        debug!("scripted backend disconnected after {} step(s)", self.total_steps);
        Ok(())
    }
}
