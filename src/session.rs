//! Engine session: owns the backend connection and the loaded bodies.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::{
    backend::{ConnectionMode, LoadOptions, PhysicsBackend},
    config::{SceneConfig, SimulationConfig},
    core::types::{BodyHandle, BodyMaterial, Pose, Velocity},
    error::{HarnessError, Result},
};

#[derive(Debug, Clone)]
struct LoadedBody {
    path: PathBuf,
    material: BodyMaterial,
}

/// A live connection to a physics backend.
///
/// The connection is closed exactly once: by [`teardown`](Self::teardown), or
/// by `Drop` if the session goes out of scope first (early return, error
/// propagation, unwinding).
pub struct EngineSession<B: PhysicsBackend> {
    backend: B,
    mode: ConnectionMode,
    config: Option<SimulationConfig>,
    bodies: BTreeMap<BodyHandle, LoadedBody>,
    connected: bool,
}

impl<B: PhysicsBackend> EngineSession<B> {
    /// Connects `backend` in the given mode.
    pub fn initialize(mut backend: B, mode: ConnectionMode) -> Result<Self> {
        backend.connect(mode)?;
        info!("connected to {} backend ({mode:?})", backend.name());
        Ok(Self {
            backend,
            mode,
            config: None,
            bodies: BTreeMap::new(),
            connected: true,
        })
    }

    pub fn mode(&self) -> ConnectionMode {
        self.mode
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Simulation parameters from the last `configure` call.
    pub fn config(&self) -> Option<&SimulationConfig> {
        self.config.as_ref()
    }

    /// Pushes timestep, gravity and search path to the backend. Last call wins.
    pub fn configure(&mut self, config: &SimulationConfig) -> Result<()> {
        self.ensure_connected()?;
        self.backend.set_time_step(config.time_step)?;
        self.backend.set_gravity(config.gravity)?;
        self.backend.set_search_path(config.search_path.as_deref())?;
        debug!(
            "configured dt = {:.6} s, gravity = {:?}, search path = {:?}",
            config.time_step, config.gravity, config.search_path
        );
        self.config = Some(config.clone());
        Ok(())
    }

    pub fn load_body(&mut self, path: impl AsRef<Path>, options: &LoadOptions) -> Result<BodyHandle> {
        self.ensure_connected()?;
        let path = path.as_ref();
        let handle = self.backend.load_body(path, options)?;
        info!("loaded {} as {handle}", path.display());
        self.bodies.insert(
            handle,
            LoadedBody {
                path: path.to_path_buf(),
                material: BodyMaterial::default(),
            },
        );
        Ok(handle)
    }

    /// Applies material overrides to a loaded body, last write wins per property.
    pub fn set_material(&mut self, body: BodyHandle, material: &BodyMaterial) -> Result<()> {
        self.ensure_connected()?;
        if !self.bodies.contains_key(&body) {
            return Err(HarnessError::UnknownBody(body));
        }
        self.backend.change_dynamics(body, material)?;
        if let Some(loaded) = self.bodies.get_mut(&body) {
            loaded.material = loaded.material.merged_with(material);
        }
        Ok(())
    }

    /// Effective material of a body: every override applied so far, merged.
    pub fn material(&self, body: BodyHandle) -> Option<BodyMaterial> {
        self.bodies.get(&body).map(|loaded| loaded.material)
    }

    pub fn model_path(&self, body: BodyHandle) -> Option<&Path> {
        self.bodies.get(&body).map(|loaded| loaded.path.as_path())
    }

    pub fn bodies(&self) -> impl Iterator<Item = BodyHandle> + '_ {
        self.bodies.keys().copied()
    }

    pub fn reset_pose(&mut self, body: BodyHandle, pose: Pose) -> Result<()> {
        self.ensure_connected()?;
        self.backend.reset_base_pose(body, pose)
    }

    /// Advances one fixed timestep. Fails until `configure` has been called.
    pub fn step(&mut self) -> Result<()> {
        self.ensure_connected()?;
        if self.config.is_none() {
            return Err(HarnessError::NotConfigured);
        }
        self.backend.step_simulation()
    }

    pub fn pose(&self, body: BodyHandle) -> Result<Pose> {
        self.ensure_connected()?;
        self.backend.base_pose(body)
    }

    pub fn velocity(&self, body: BodyHandle) -> Result<Velocity> {
        self.ensure_connected()?;
        self.backend.base_velocity(body)
    }

    /// Closes the connection.
    pub fn teardown(mut self) -> Result<()> {
        self.disconnect()
    }

    fn disconnect(&mut self) -> Result<()> {
        if !self.connected {
            return Ok(());
        }
        self.connected = false;
        self.backend.disconnect()?;
        info!("disconnected from {} backend", self.backend.name());
        Ok(())
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(HarnessError::NotConnected)
        }
    }
}

impl<B: PhysicsBackend> Drop for EngineSession<B> {
    fn drop(&mut self) {
        if self.connected {
            if let Err(err) = self.disconnect() {
                warn!("failed to disconnect from {} backend: {err}", self.backend.name());
            }
        }
    }
}

/// Handles of the two bodies in a drop scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropScene {
    pub object: BodyHandle,
    pub plane: BodyHandle,
}

impl DropScene {
    /// Loads the falling object and the plane, then applies their materials
    /// (plane first, then object).
    pub fn setup<B: PhysicsBackend>(
        session: &mut EngineSession<B>,
        scene: &SceneConfig,
    ) -> Result<Self> {
        let object = session.load_body(
            &scene.object.model,
            &LoadOptions {
                use_fixed_base: scene.object.use_fixed_base,
                use_inertia_from_file: scene.object.use_inertia_from_file,
                ..LoadOptions::default()
            },
        )?;
        let plane = session.load_body(
            &scene.plane.model,
            &LoadOptions {
                use_fixed_base: scene.plane.use_fixed_base,
                use_inertia_from_file: scene.plane.use_inertia_from_file,
                ..LoadOptions::default()
            },
        )?;

        if !scene.plane.material.is_empty() {
            session.set_material(plane, &scene.plane.material)?;
        }
        if !scene.object.material.is_empty() {
            session.set_material(object, &scene.object.material)?;
        }
        Ok(Self { object, plane })
    }
}
