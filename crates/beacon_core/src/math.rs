//! Math utilities
//!
//! Re-exports glam with the few angle helpers the configuration layer needs

pub use glam::*;

use std::f32::consts::{PI, TAU};

/// Wrap an angle in radians into (-π, π].
pub fn signed_normalize(angle: f32) -> f32 {
    let mut wrapped = angle.rem_euclid(TAU);
    if wrapped > PI {
        wrapped -= TAU;
    }
    wrapped
}

/// Orientation from Euler angles given in degrees, applied as yaw (Z),
/// pitch (Y), roll (X).
pub fn quat_from_euler_degrees(z: f32, y: f32, x: f32) -> Quat {
    Quat::from_euler(
        EulerRot::ZYX,
        z.to_radians(),
        y.to_radians(),
        x.to_radians(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_normalize_wraps_into_half_open_range() {
        assert!((signed_normalize(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-5);
        assert!((signed_normalize(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-5);
        assert!((signed_normalize(PI) - PI).abs() < 1e-5);
        assert_eq!(signed_normalize(0.0), 0.0);
    }

    #[test]
    fn yaw_rotates_about_z() {
        let q = quat_from_euler_degrees(90.0, 0.0, 0.0);
        let v = q * Vec3::X;
        assert!(v.abs_diff_eq(Vec3::Y, 1e-5));
    }
}
