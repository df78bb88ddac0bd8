//! Robot-wide constants and tunable configuration.

use embassy_time::Duration;

/// Scheduler tick period.
pub const LOOP_PERIOD: Duration = Duration::from_millis(20);

/// Nominal battery voltage used to scale voltage commands to drive fractions.
pub const NOMINAL_BATTERY_VOLTAGE: f32 = 12.0;

pub mod intake {
    use embassy_time::Duration;

    pub const INTAKE_VOLTS: f32 = 10.0;
    pub const OUTTAKE_VOLTS: f32 = -10.0;

    /// Intake and pass run for half as long as outtake.
    pub const INTAKE_TIMEOUT: Duration = Duration::from_secs(2);
    pub const OUTTAKE_TIMEOUT: Duration = Duration::from_secs(4);
}

pub mod shooter {
    use serde::Deserialize;

    /// Telemetry key for the flywheel encoder velocity (RPM).
    pub const VELOCITY_KEY: &str = "/shooter/encoder/velocity";
    /// Telemetry key for the flywheel encoder position (rotations).
    pub const POSITION_KEY: &str = "/shooter/encoder/position";

    /// Largest velocity error (rad/s) that still counts as at setpoint.
    pub const SPEED_TOLERANCE: f32 = 0.05;
    /// Largest error rate (rad/s²) that still counts as at setpoint. Unbounded.
    pub const ACCEL_TOLERANCE: f32 = f32::INFINITY;
    /// Bounds on the integral term's contribution, in volts.
    pub const INTEGRATOR_RANGE: (f32, f32) = (-1.0, 1.0);

    /// PID gains for the flywheel velocity loop.
    ///
    /// Deserializes from JSON such as `{"kp":0.5,"ki":0.0,"kd":0.0}`; missing
    /// fields fall back to [`ShooterGains::DEFAULT`].
    #[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
    #[serde(default)]
    pub struct ShooterGains {
        pub kp: f32,
        pub ki: f32,
        pub kd: f32,
    }

    impl ShooterGains {
        pub const DEFAULT: Self = Self {
            kp: 0.5,
            ki: 0.0,
            kd: 0.0,
        };
    }

    impl Default for ShooterGains {
        fn default() -> Self {
            Self::DEFAULT
        }
    }
}
