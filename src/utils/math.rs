//! Additional math helpers layered on top of `glam`.

use glam::{EulerRot, Quat};

/// `num` evenly spaced samples over `[start, end]`, both ends included.
pub fn linspace(start: f32, end: f32, num: usize) -> Vec<f32> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (num - 1) as f32;
            (0..num)
                .map(|i| {
                    if i == num - 1 {
                        end
                    } else {
                        start + step * i as f32
                    }
                })
                .collect()
        }
    }
}

/// Roll/pitch/yaw to quaternion, composed as `Rz(yaw) * Ry(pitch) * Rx(roll)`.
pub fn quat_from_euler(roll: f32, pitch: f32, yaw: f32) -> Quat {
    Quat::from_euler(EulerRot::ZYX, yaw, pitch, roll)
}

/// Inverse of [`quat_from_euler`], returned as `[roll, pitch, yaw]`.
pub fn euler_from_quat(rotation: Quat) -> [f32; 3] {
    let (yaw, pitch, roll) = rotation.to_euler(EulerRot::ZYX);
    [roll, pitch, yaw]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec3;

    #[test]
    fn linspace_includes_both_ends() {
        let values = linspace(1.0, 1.5, 3);
        assert_eq!(values, vec![1.0, 1.25, 1.5]);
    }

    #[test]
    fn linspace_degenerate_counts() {
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
    }

    #[test]
    fn euler_composes_extrinsic_xyz() {
        let (roll, pitch, yaw) = (0.3, -0.7, 1.9);
        let expected = Quat::from_rotation_z(yaw)
            * Quat::from_rotation_y(pitch)
            * Quat::from_rotation_x(roll);
        let actual = quat_from_euler(roll, pitch, yaw);

        let probe = Vec3::new(0.2, -1.0, 0.5);
        let a = actual * probe;
        let b = expected * probe;
        assert_relative_eq!(a.x, b.x, epsilon = 1e-5);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-5);
        assert_relative_eq!(a.z, b.z, epsilon = 1e-5);
    }

    #[test]
    fn euler_round_trip_in_principal_range() {
        let angles = [0.4, 0.2, -1.1];
        let back = euler_from_quat(quat_from_euler(angles[0], angles[1], angles[2]));
        for (a, b) in angles.iter().zip(back.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-4);
        }
    }
}
