//! Backend over the `rapier3d` rigid-body engine.
//!
//! Bodies are built from [`RigidBodyModel`]s: URDF files on disk or the
//! built-in plane. Rapier has no rolling or spinning friction; those
//! properties are accepted and ignored with a warning.

use std::path::{Path, PathBuf};

use glam::{Quat, Vec3};
use log::{debug, info, trace, warn};
use rapier3d::na::{Quaternion, Translation3, Unit, UnitQuaternion};
use rapier3d::prelude::*;

use super::{ConnectionMode, LoadOptions, PhysicsBackend};
use crate::{
    config::{DEFAULT_GRAVITY, DEFAULT_TIME_STEP},
    core::types::{BodyHandle, BodyMaterial, Pose, Velocity},
    error::{HarnessError, Result},
    model::{load_urdf, resolve_model_path, Geometry, RigidBodyModel, ResolvedModel},
};

/// Density used for shape-derived mass when inertia is not taken from file (kg/m³).
const DEFAULT_DENSITY: f32 = 1000.0;

struct World {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
}

impl World {
    fn new() -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = DEFAULT_TIME_STEP;
        Self {
            gravity: to_vector(Vec3::from_array(DEFAULT_GRAVITY)),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
        }
    }

    fn step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }
}

/// Physics backend driving an in-process rapier world.
pub struct RapierBackend {
    world: Option<World>,
    mode: ConnectionMode,
    search_path: Option<PathBuf>,
    bodies: Vec<RigidBodyHandle>,
    warned_unsupported_friction: bool,
}

impl Default for RapierBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierBackend {
    pub fn new() -> Self {
        Self {
            world: None,
            mode: ConnectionMode::Direct,
            search_path: None,
            bodies: Vec::new(),
            warned_unsupported_friction: false,
        }
    }

    pub fn mode(&self) -> ConnectionMode {
        self.mode
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn world(&self) -> Result<&World> {
        self.world.as_ref().ok_or(HarnessError::NotConnected)
    }

    fn world_mut(&mut self) -> Result<&mut World> {
        self.world.as_mut().ok_or(HarnessError::NotConnected)
    }

    fn rapier_handle(&self, body: BodyHandle) -> Result<RigidBodyHandle> {
        self.bodies
            .get(body.index())
            .copied()
            .ok_or(HarnessError::UnknownBody(body))
    }

    fn insert_model(
        &mut self,
        model: &RigidBodyModel,
        options: &LoadOptions,
    ) -> Result<RigidBodyHandle> {
        let fixed = options.use_fixed_base || model.is_static_only();
        let builder = if fixed {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
        };
        let mut builder =
            builder.position(to_isometry(options.base_position, options.base_orientation));

        let inertia_from_file = match (&model.inertial, options.use_inertia_from_file, fixed) {
            (Some(inertial), true, false) => {
                builder = builder.additional_mass_properties(MassProperties::new(
                    point![
                        inertial.center_of_mass.x,
                        inertial.center_of_mass.y,
                        inertial.center_of_mass.z
                    ],
                    inertial.mass,
                    to_vector(inertial.principal_inertia),
                ));
                true
            }
            (None, true, false) => {
                warn!(
                    "model '{}' has no inertial block; deriving mass from collision shapes",
                    model.name
                );
                false
            }
            _ => false,
        };

        let world = self.world_mut()?;
        let handle = world.rigid_body_set.insert(builder.build());
        let density = if inertia_from_file { 0.0 } else { DEFAULT_DENSITY };
        for shape in &model.collisions {
            let (builder, frame) = collider_for(&shape.geometry);
            let collider = builder
                .position(to_isometry(
                    shape.origin.position,
                    shape.origin.orientation * frame,
                ))
                .density(density)
                .build();
            world
                .collider_set
                .insert_with_parent(collider, handle, &mut world.rigid_body_set);
        }
        Ok(handle)
    }
}

impl PhysicsBackend for RapierBackend {
    fn name(&self) -> &str {
        "rapier"
    }

    fn connect(&mut self, mode: ConnectionMode) -> Result<()> {
        if self.world.is_some() {
            return Err(HarnessError::connection(self.name(), "already connected"));
        }
        if mode.is_interactive() {
            warn!("rapier backend has no viewer; running headless, paced, with per-step poses logged");
        }
        self.mode = mode;
        self.world = Some(World::new());
        self.bodies.clear();
        info!("rapier backend connected ({mode:?})");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.world.is_some()
    }

    fn set_time_step(&mut self, time_step: f32) -> Result<()> {
        if !(time_step > 0.0) {
            return Err(HarnessError::backend(format!(
                "time step must be positive, got {time_step}"
            )));
        }
        self.world_mut()?.integration_parameters.dt = time_step;
        Ok(())
    }

    fn set_gravity(&mut self, gravity: Vec3) -> Result<()> {
        self.world_mut()?.gravity = to_vector(gravity);
        Ok(())
    }

    fn set_search_path(&mut self, path: Option<&Path>) -> Result<()> {
        self.world()?;
        self.search_path = path.map(Path::to_path_buf);
        Ok(())
    }

    fn load_body(&mut self, path: &Path, options: &LoadOptions) -> Result<BodyHandle> {
        self.world()?;
        let model = match resolve_model_path(path, self.search_path.as_deref())? {
            ResolvedModel::Builtin(model) => model,
            ResolvedModel::File(file) => load_urdf(&file)?,
        };
        if model.collisions.is_empty() {
            return Err(HarnessError::model_load(path, "model has no collision geometry"));
        }

        let rapier = self.insert_model(&model, options)?;
        let handle = BodyHandle::from_index(self.bodies.len() as u32);
        self.bodies.push(rapier);
        debug!("loaded '{}' from {} as {handle}", model.name, path.display());
        Ok(handle)
    }

    fn change_dynamics(&mut self, body: BodyHandle, update: &BodyMaterial) -> Result<()> {
        let handle = self.rapier_handle(body)?;
        if (update.rolling_friction.is_some() || update.spinning_friction.is_some())
            && !self.warned_unsupported_friction
        {
            warn!("rapier backend ignores rolling and spinning friction");
            self.warned_unsupported_friction = true;
        }

        let world = self.world_mut()?;
        let rigid_body = world
            .rigid_body_set
            .get_mut(handle)
            .ok_or(HarnessError::UnknownBody(body))?;
        if let Some(damping) = update.linear_damping {
            rigid_body.set_linear_damping(damping);
        }
        if let Some(damping) = update.angular_damping {
            rigid_body.set_angular_damping(damping);
        }
        let colliders: Vec<ColliderHandle> = rigid_body.colliders().to_vec();

        for collider in colliders {
            if let Some(collider) = world.collider_set.get_mut(collider) {
                if let Some(friction) = update.lateral_friction {
                    collider.set_friction(friction);
                }
                if let Some(restitution) = update.restitution {
                    collider.set_restitution(restitution);
                }
            }
        }
        Ok(())
    }

    fn reset_base_pose(&mut self, body: BodyHandle, pose: Pose) -> Result<()> {
        let handle = self.rapier_handle(body)?;
        let world = self.world_mut()?;
        let rigid_body = world
            .rigid_body_set
            .get_mut(handle)
            .ok_or(HarnessError::UnknownBody(body))?;
        rigid_body.set_position(to_isometry(pose.position, pose.orientation), true);
        rigid_body.set_linvel(vector![0.0, 0.0, 0.0], true);
        rigid_body.set_angvel(vector![0.0, 0.0, 0.0], true);
        Ok(())
    }

    fn step_simulation(&mut self) -> Result<()> {
        let world = self.world_mut()?;
        world.step();
        trace!("rapier step (dt = {})", world.integration_parameters.dt);
        Ok(())
    }

    fn base_pose(&self, body: BodyHandle) -> Result<Pose> {
        let handle = self.rapier_handle(body)?;
        let rigid_body = self
            .world()?
            .rigid_body_set
            .get(handle)
            .ok_or(HarnessError::UnknownBody(body))?;
        Ok(Pose::new(
            from_vector(rigid_body.translation()),
            from_rotation(rigid_body.rotation()),
        ))
    }

    fn base_velocity(&self, body: BodyHandle) -> Result<Velocity> {
        let handle = self.rapier_handle(body)?;
        let rigid_body = self
            .world()?
            .rigid_body_set
            .get(handle)
            .ok_or(HarnessError::UnknownBody(body))?;
        Ok(Velocity {
            linear: from_vector(rigid_body.linvel()),
            angular: from_vector(rigid_body.angvel()),
        })
    }

    fn disconnect(&mut self) -> Result<()> {
        if self.world.take().is_none() {
            return Err(HarnessError::NotConnected);
        }
        self.bodies.clear();
        info!("rapier backend disconnected");
        Ok(())
    }
}

/// Collider for `geometry` plus the rotation from the model frame to rapier's shape frame.
fn collider_for(geometry: &Geometry) -> (ColliderBuilder, Quat) {
    match *geometry {
        Geometry::Box { half_extents } => (
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z),
            Quat::IDENTITY,
        ),
        Geometry::Sphere { radius } => (ColliderBuilder::ball(radius), Quat::IDENTITY),
        // Rapier cylinders run along Y; model cylinders run along Z.
        Geometry::Cylinder { radius, length } => (
            ColliderBuilder::new(SharedShape::cylinder(length * 0.5, radius)),
            Quat::from_rotation_x(std::f32::consts::FRAC_PI_2),
        ),
        Geometry::Capsule { radius, length } => (
            ColliderBuilder::capsule_z(length * 0.5, radius),
            Quat::IDENTITY,
        ),
        Geometry::Plane { normal } => (
            ColliderBuilder::halfspace(Unit::new_normalize(to_vector(normal))),
            Quat::IDENTITY,
        ),
    }
}

fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn to_isometry(position: Vec3, orientation: Quat) -> Isometry<Real> {
    let rotation = UnitQuaternion::new_normalize(Quaternion::new(
        orientation.w,
        orientation.x,
        orientation.y,
        orientation.z,
    ));
    Isometry::from_parts(Translation3::new(position.x, position.y, position.z), rotation)
}

fn from_rotation(rotation: &Rotation<Real>) -> Quat {
    let q = rotation.quaternion();
    Quat::from_xyzw(q.i, q.j, q.k, q.w)
}
