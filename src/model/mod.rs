//! Rigid-body model descriptions consumed by backends that build their own bodies.
//!
//! Only single-link models are supported: one inertial block plus any number
//! of primitive collision shapes. Articulations and mesh collision geometry
//! are rejected with [`ModelError::Unsupported`].

pub mod assets;
pub mod urdf;

use glam::Vec3;
use thiserror::Error;

use crate::core::types::Pose;

pub use assets::{builtin_model, resolve_model_path, ResolvedModel, BUILTIN_PLANE};
pub use urdf::{load_urdf, parse_urdf_str};

/// Errors raised while reading a model description.
#[derive(Debug, Error)]
pub enum ModelError {
    /// XML parsing error.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// Missing required element.
    #[error("missing required element: {element} in {context}")]
    MissingElement {
        element: &'static str,
        context: String,
    },

    /// Missing required attribute.
    #[error("missing required attribute: {attribute} on {element}")]
    MissingAttribute {
        attribute: &'static str,
        element: String,
    },

    /// Attribute present but unparsable or out of range.
    #[error("invalid value for {attribute} on {element}: {message}")]
    InvalidAttribute {
        attribute: &'static str,
        element: String,
        message: String,
    },

    /// Valid description using something this loader does not handle.
    #[error("unsupported model feature: {0}")]
    Unsupported(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModelError {
    pub fn missing_element(element: &'static str, context: impl Into<String>) -> Self {
        Self::MissingElement {
            element,
            context: context.into(),
        }
    }

    pub fn missing_attribute(attribute: &'static str, element: impl Into<String>) -> Self {
        Self::MissingAttribute {
            attribute,
            element: element.into(),
        }
    }

    pub fn invalid_attribute(
        attribute: &'static str,
        element: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            attribute,
            element: element.into(),
            message: message.into(),
        }
    }
}

/// Collision geometry in the link frame. Cylinders and capsules run along Z.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    Cylinder { radius: f32, length: f32 },
    Capsule { radius: f32, length: f32 },
    /// Infinite plane through the shape origin with the given outward normal.
    Plane { normal: Vec3 },
}

/// A collision shape placed relative to the link frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionShape {
    pub origin: Pose,
    pub geometry: Geometry,
}

/// Mass and diagonal inertia of the link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inertial {
    /// Center of mass in the link frame.
    pub center_of_mass: Vec3,
    pub mass: f32,
    /// `(ixx, iyy, izz)`.
    pub principal_inertia: Vec3,
    /// `(ixy, ixz, iyz)`; kept for diagnostics, not applied.
    pub products_of_inertia: Vec3,
}

/// A single rigid body as described by a model file.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBodyModel {
    pub name: String,
    pub link: String,
    pub inertial: Option<Inertial>,
    pub collisions: Vec<CollisionShape>,
}

impl RigidBodyModel {
    pub fn is_static_only(&self) -> bool {
        self.collisions
            .iter()
            .all(|shape| matches!(shape.geometry, Geometry::Plane { .. }))
    }
}
