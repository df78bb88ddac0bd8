//! First-order DC motor model for host-side runs and tests.
//!
//! Velocity relaxes toward `voltage / nominal_voltage * free_speed` with a
//! single time constant. Good enough to close a velocity loop against; no
//! current limits, friction or load.

use core::convert::Infallible;

use embassy_time::Duration;

use super::controllers::Actuator;
use crate::constants::NOMINAL_BATTERY_VOLTAGE;

/// Free speed of a NEO brushless motor at 12 V.
pub const NEO_FREE_SPEED_RPM: f32 = 5676.0;

#[derive(Debug, Clone)]
pub struct SimMotor {
    voltage: f32,
    velocity_rpm: f32,
    position_rotations: f32,
    free_speed_rpm: f32,
    time_constant: f32,
    inverted: bool,
}

impl SimMotor {
    /// `time_constant` is in seconds.
    pub fn new(
        free_speed_rpm: f32,
        time_constant: f32,
    ) -> Self {
        Self {
            voltage: 0.0,
            velocity_rpm: 0.0,
            position_rotations: 0.0,
            free_speed_rpm,
            time_constant,
            inverted: false,
        }
    }

    /// Report velocity and position with the opposite sign, as an encoder on
    /// a reversed mount would.
    pub fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }

    /// Advance the model by `dt`.
    pub fn step(
        &mut self,
        dt: Duration,
    ) {
        let dt = dt.as_micros() as f32 / 1e6;
        if self.time_constant + dt <= 0.0 {
            return;
        }
        let target = self.voltage / NOMINAL_BATTERY_VOLTAGE * self.free_speed_rpm;
        let alpha = dt / (self.time_constant + dt);
        self.velocity_rpm += (target - self.velocity_rpm) * alpha;
        self.position_rotations += self.velocity_rpm / 60.0 * dt;
    }

    /// Last commanded voltage, clamped to the battery.
    pub fn voltage(&self) -> f32 {
        self.voltage
    }

    fn sign(&self) -> f32 {
        if self.inverted {
            -1.0
        } else {
            1.0
        }
    }
}

impl Actuator for SimMotor {
    type Error = Infallible;

    fn set_voltage(
        &mut self,
        volts: f32,
    ) -> Result<(), Self::Error> {
        self.voltage = volts.clamp(-NOMINAL_BATTERY_VOLTAGE, NOMINAL_BATTERY_VOLTAGE);
        Ok(())
    }

    fn set(
        &mut self,
        fraction: f32,
    ) -> Result<(), Self::Error> {
        self.set_voltage(fraction * NOMINAL_BATTERY_VOLTAGE)
    }

    fn velocity(&self) -> f32 {
        self.sign() * self.velocity_rpm
    }

    fn position(&self) -> f32 {
        self.sign() * self.position_rotations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settles_to_free_speed() {
        let mut motor = SimMotor::new(NEO_FREE_SPEED_RPM, 0.1);
        motor.set_voltage(12.0).unwrap();
        for _ in 0..500 {
            motor.step(Duration::from_millis(20));
        }
        assert!((motor.velocity() - NEO_FREE_SPEED_RPM).abs() < 1.0);
        assert!(motor.position() > 0.0);
    }

    #[test]
    fn test_inverted_reports_negated() {
        let mut motor = SimMotor::new(NEO_FREE_SPEED_RPM, 0.1).inverted();
        motor.set(0.5).unwrap();
        motor.step(Duration::from_millis(20));
        assert!(motor.velocity() < 0.0);
        assert!((motor.voltage() - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_zero_step_with_zero_time_constant_stays_finite() {
        let mut motor = SimMotor::new(NEO_FREE_SPEED_RPM, 0.0);
        motor.set_voltage(6.0).unwrap();
        motor.step(Duration::from_ticks(0));
        assert_eq!(motor.velocity(), 0.0);
        motor.step(Duration::from_millis(20));
        assert!((motor.velocity() - NEO_FREE_SPEED_RPM / 2.0).abs() < 1e-2);
    }

    #[test]
    fn test_voltage_clamped_to_battery() {
        let mut motor = SimMotor::new(NEO_FREE_SPEED_RPM, 0.1);
        motor.set_voltage(100.0).unwrap();
        assert_eq!(motor.voltage(), NOMINAL_BATTERY_VOLTAGE);
    }
}
