//! Built-in assets and model path resolution.

use std::path::{Path, PathBuf};

use crate::{
    core::types::Pose,
    error::{HarnessError, Result},
};

use super::{CollisionShape, Geometry, RigidBodyModel};

/// File name of the built-in ground plane.
pub const BUILTIN_PLANE: &str = "plane.urdf";

/// Where a requested model comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedModel {
    File(PathBuf),
    Builtin(RigidBodyModel),
}

/// Built-in model registered under `name`, if any.
pub fn builtin_model(name: &str) -> Option<RigidBodyModel> {
    match name {
        BUILTIN_PLANE => Some(RigidBodyModel {
            name: "plane".into(),
            link: "planeLink".into(),
            inertial: None,
            collisions: vec![CollisionShape {
                origin: Pose::default(),
                geometry: Geometry::Plane {
                    normal: glam::Vec3::Z,
                },
            }],
        }),
        _ => None,
    }
}

/// Resolves `path` the way the backends look models up.
///
/// Order: the path as given, then relative to `search_path`, then the
/// built-in assets by file name.
pub fn resolve_model_path(path: &Path, search_path: Option<&Path>) -> Result<ResolvedModel> {
    if path.is_file() {
        return Ok(ResolvedModel::File(path.to_path_buf()));
    }

    if let Some(dir) = search_path.filter(|_| path.is_relative()) {
        let candidate = dir.join(path);
        if candidate.is_file() {
            return Ok(ResolvedModel::File(candidate));
        }
    }

    path.file_name()
        .and_then(|name| name.to_str())
        .filter(|_| path.parent().map_or(true, |p| p.as_os_str().is_empty()))
        .and_then(builtin_model)
        .map(ResolvedModel::Builtin)
        .ok_or_else(|| HarnessError::model_load(path, "file not found"))
}
