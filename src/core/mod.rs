//! Core value types shared by the session, the harness and the backends.

pub mod trial;
pub mod types;

pub use trial::{DropTrial, EulerAngles, OrientationSampler, SettlingState};
pub use types::{BodyHandle, BodyMaterial, Pose, Velocity};
