//! Angular velocity unit conversions.
//!
//! Motor controllers report velocity in revolutions per minute while the
//! shooter loop works in radians per second.
//!
//! # Example
//! ```rust
//! use crescendo_core::utils::math::units::rpm_to_rad_per_sec;
//! let w = rpm_to_rad_per_sec(60.0);
//! assert!((w - core::f32::consts::TAU).abs() < 1e-5);
//! ```

use core::f32::consts::TAU;

/// Convert revolutions per minute to radians per second.
pub fn rpm_to_rad_per_sec(rpm: f32) -> f32 {
    rpm * TAU / 60.0
}

/// Convert radians per second to revolutions per minute.
pub fn rad_per_sec_to_rpm(rad_per_sec: f32) -> f32 {
    rad_per_sec * 60.0 / TAU
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_revolution_per_second() {
        assert!((rpm_to_rad_per_sec(60.0) - TAU).abs() < 1e-5);
    }

    #[test]
    fn test_zero_and_sign() {
        assert_eq!(rpm_to_rad_per_sec(0.0), 0.0);
        assert!(rpm_to_rad_per_sec(-120.0) < 0.0);
    }

    #[test]
    fn test_inverse() {
        let rpm = 4321.0;
        let back = rad_per_sec_to_rpm(rpm_to_rad_per_sec(rpm));
        assert!((back - rpm).abs() < 1e-2);
    }
}
