use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a body loaded into a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

impl BodyHandle {
    pub fn from_index(index: u32) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// Base position and orientation of a body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

impl Pose {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Vertical coordinate of the base (Z-up).
    pub fn height(&self) -> f32 {
        self.position.z
    }
}

/// Linear and angular velocity of a rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub linear: Vec3,
    pub angular: Vec3,
}

impl Default for Velocity {
    fn default() -> Self {
        Self {
            linear: Vec3::ZERO,
            angular: Vec3::ZERO,
        }
    }
}

/// Per-body dynamics overrides. `None` leaves the backend's current value alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyMaterial {
    pub linear_damping: Option<f32>,
    pub angular_damping: Option<f32>,
    pub lateral_friction: Option<f32>,
    /// Resistance to rolling at the contact patch.
    pub rolling_friction: Option<f32>,
    /// Resistance to twisting about the contact normal.
    pub spinning_friction: Option<f32>,
    pub restitution: Option<f32>,
}

impl BodyMaterial {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Layers `update` on top of `self`; properties set in `update` win.
    pub fn merged_with(&self, update: &Self) -> Self {
        Self {
            linear_damping: update.linear_damping.or(self.linear_damping),
            angular_damping: update.angular_damping.or(self.angular_damping),
            lateral_friction: update.lateral_friction.or(self.lateral_friction),
            rolling_friction: update.rolling_friction.or(self.rolling_friction),
            spinning_friction: update.spinning_friction.or(self.spinning_friction),
            restitution: update.restitution.or(self.restitution),
        }
    }

    pub fn damping(linear: f32, angular: f32) -> Self {
        Self {
            linear_damping: Some(linear),
            angular_damping: Some(angular),
            ..Self::default()
        }
    }

    /// Same coefficient for lateral, rolling and spinning friction.
    pub fn friction(coefficient: f32) -> Self {
        Self {
            lateral_friction: Some(coefficient),
            rolling_friction: Some(coefficient),
            spinning_friction: Some(coefficient),
            ..Self::default()
        }
    }

    pub fn restitution(restitution: f32) -> Self {
        Self {
            restitution: Some(restitution),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_material_wins_per_property() {
        let first = BodyMaterial::damping(0.1, 0.2).merged_with(&BodyMaterial::restitution(0.6));
        let second = first.merged_with(&BodyMaterial::damping(0.01, 0.02));

        assert_eq!(second.linear_damping, Some(0.01));
        assert_eq!(second.angular_damping, Some(0.02));
        assert_eq!(second.restitution, Some(0.6));
        assert_eq!(second.lateral_friction, None);
    }

    #[test]
    fn empty_update_changes_nothing() {
        let base = BodyMaterial::friction(0.5);
        assert_eq!(base.merged_with(&BodyMaterial::default()), base);
        assert!(BodyMaterial::default().is_empty());
        assert!(!base.is_empty());
    }
}
