//! Discrete PID evaluator for the shooter velocity loop.

use crate::constants::{
    shooter::{ShooterGains, ACCEL_TOLERANCE, INTEGRATOR_RANGE, SPEED_TOLERANCE},
    LOOP_PERIOD,
};

/// The interface the shooter needs from a feedback controller.
pub trait Feedback {
    /// Clear integrator and derivative history.
    fn reset(&mut self);

    fn set_setpoint(
        &mut self,
        setpoint: f32,
    );

    fn setpoint(&self) -> f32;

    /// Compute the control output for a new measurement.
    fn calculate(
        &mut self,
        measurement: f32,
    ) -> f32;

    /// True once a measurement has been taken and the errors are within tolerance.
    fn at_setpoint(&self) -> bool;
}

/// A simple discrete PID controller with a fixed period.
///
/// The output is not clamped. The integral term is limited so that
/// `ki * integral` stays within the integrator range (±1 by default).
#[derive(Debug, Clone)]
pub struct PidController {
    kp: f32,
    ki: f32,
    kd: f32,
    dt: f32,

    setpoint: f32,
    measurement: f32,
    prev_err: f32,
    err: f32,
    err_rate: f32,
    integral: f32,

    integrator_min: f32,
    integrator_max: f32,
    position_tolerance: f32,
    velocity_tolerance: f32,

    have_setpoint: bool,
    have_measurement: bool,
}

impl PidController {
    pub fn new(
        kp: f32,
        ki: f32,
        kd: f32,
        dt: f32,
    ) -> Self {
        Self {
            kp,
            ki,
            kd,
            dt,
            setpoint: 0.0,
            measurement: 0.0,
            prev_err: 0.0,
            err: 0.0,
            err_rate: 0.0,
            integral: 0.0,
            integrator_min: -1.0,
            integrator_max: 1.0,
            position_tolerance: 0.05,
            velocity_tolerance: f32::INFINITY,
            have_setpoint: false,
            have_measurement: false,
        }
    }

    /// Set the error and error-rate bands used by `at_setpoint`.
    pub fn with_tolerance(
        mut self,
        position: f32,
        velocity: f32,
    ) -> Self {
        self.position_tolerance = position;
        self.velocity_tolerance = velocity;
        self
    }

    /// Limit the integral contribution to `[min, max]`.
    pub fn with_integrator_range(
        mut self,
        min: f32,
        max: f32,
    ) -> Self {
        self.integrator_min = min;
        self.integrator_max = max;
        self
    }

    /// Error from the last update (setpoint minus measurement).
    pub fn error(&self) -> f32 {
        self.err
    }
}

impl From<ShooterGains> for PidController {
    fn from(gains: ShooterGains) -> Self {
        let (integrator_min, integrator_max) = INTEGRATOR_RANGE;
        PidController::new(gains.kp, gains.ki, gains.kd, LOOP_PERIOD.as_micros() as f32 / 1e6)
            .with_tolerance(SPEED_TOLERANCE, ACCEL_TOLERANCE)
            .with_integrator_range(integrator_min, integrator_max)
    }
}

impl Feedback for PidController {
    fn reset(&mut self) {
        self.prev_err = 0.0;
        self.err = 0.0;
        self.err_rate = 0.0;
        self.integral = 0.0;
        self.have_measurement = false;
    }

    fn set_setpoint(
        &mut self,
        setpoint: f32,
    ) {
        self.setpoint = setpoint;
        self.have_setpoint = true;
        self.err = self.setpoint - self.measurement;
        self.err_rate = (self.err - self.prev_err) / self.dt;
    }

    fn setpoint(&self) -> f32 {
        self.setpoint
    }

    fn calculate(
        &mut self,
        measurement: f32,
    ) -> f32 {
        self.measurement = measurement;
        self.have_measurement = true;
        self.prev_err = self.err;
        self.err = self.setpoint - measurement;
        self.err_rate = (self.err - self.prev_err) / self.dt;

        if self.ki != 0.0 {
            let a = self.integrator_min / self.ki;
            let b = self.integrator_max / self.ki;
            self.integral = (self.integral + self.err * self.dt).clamp(a.min(b), a.max(b));
        }

        self.kp * self.err + self.ki * self.integral + self.kd * self.err_rate
    }

    fn at_setpoint(&self) -> bool {
        self.have_measurement
            && self.have_setpoint
            && libm::fabsf(self.err) < self.position_tolerance
            && libm::fabsf(self.err_rate) < self.velocity_tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.02;

    #[test]
    fn test_proportional_output() {
        let mut pid = PidController::new(1.0, 0.0, 0.0, DT);
        pid.set_setpoint(100.0);
        assert!((pid.calculate(0.0) - 100.0).abs() < 1e-4);
        assert!((pid.calculate(40.0) - 60.0).abs() < 1e-4);
    }

    #[test]
    fn test_integral_accumulates_and_clamps() {
        let mut pid = PidController::new(0.0, 1.0, 0.0, DT);
        pid.set_setpoint(10.0);
        // 10 * 0.02 = 0.2 per step
        assert!((pid.calculate(0.0) - 0.2).abs() < 1e-4);
        assert!((pid.calculate(0.0) - 0.4).abs() < 1e-4);
        for _ in 0..100 {
            pid.calculate(0.0);
        }
        assert!((pid.calculate(0.0) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_negative_ki_does_not_panic() {
        let mut pid = PidController::new(0.0, -1.0, 0.0, DT);
        pid.set_setpoint(10.0);
        let out = pid.calculate(0.0);
        assert!(out.is_finite());
    }

    #[test]
    fn test_derivative_uses_error_rate() {
        let mut pid = PidController::new(0.0, 0.0, 1.0, DT);
        pid.set_setpoint(1.0);
        pid.calculate(0.0);
        // error goes 1.0 -> 0.5 over one period
        let out = pid.calculate(0.5);
        assert!((out - (-25.0)).abs() < 1e-3);
    }

    #[test]
    fn test_at_setpoint_requires_measurement() {
        let mut pid = PidController::new(1.0, 0.0, 0.0, DT);
        pid.set_setpoint(0.0);
        assert!(!pid.at_setpoint());
        pid.calculate(0.0);
        assert!(pid.at_setpoint());
        pid.calculate(1.0);
        assert!(!pid.at_setpoint());
    }

    #[test]
    fn test_reset_clears_history() {
        let mut pid = PidController::new(1.0, 1.0, 0.0, DT);
        pid.set_setpoint(5.0);
        pid.calculate(5.0);
        assert!(pid.at_setpoint());
        pid.calculate(0.0);
        pid.reset();
        assert!(!pid.at_setpoint());
        assert_eq!(pid.error(), 0.0);
        // integral restarted: 5 * 1.0 + 1.0 * (5 * 0.02)
        assert!((pid.calculate(0.0) - 5.1).abs() < 1e-4);
    }

    #[test]
    fn test_tolerance_bands() {
        let mut pid = PidController::new(1.0, 0.0, 0.0, DT).with_tolerance(2.0, 60.0);
        pid.set_setpoint(10.0);
        pid.calculate(10.0);
        // error 0 but error rate (0 - 10) / 0.02 = -500 is outside the band
        assert!(!pid.at_setpoint());
        pid.calculate(9.0);
        // error 1, rate 50: both inside
        assert!(pid.at_setpoint());
        pid.calculate(7.5);
        // error 2.5 is outside the position band
        assert!(!pid.at_setpoint());
    }

    #[test]
    fn test_integrator_range() {
        let mut pid = PidController::new(0.0, 2.0, 0.0, DT).with_integrator_range(-0.5, 3.0);
        pid.set_setpoint(100.0);
        for _ in 0..50 {
            pid.calculate(0.0);
        }
        assert!((pid.calculate(0.0) - 3.0).abs() < 1e-4);

        pid.set_setpoint(-100.0);
        for _ in 0..50 {
            pid.calculate(0.0);
        }
        assert!((pid.calculate(0.0) - (-0.5)).abs() < 1e-4);
    }

    #[test]
    fn test_from_gains_uses_shooter_tolerance() {
        let mut pid = PidController::from(ShooterGains::DEFAULT);
        pid.set_setpoint(100.0);
        pid.calculate(100.0 - SPEED_TOLERANCE * 0.5);
        assert!(pid.at_setpoint());
        pid.calculate(100.0 - SPEED_TOLERANCE * 2.0);
        assert!(!pid.at_setpoint());
    }

    #[test]
    fn test_from_gains() {
        let mut pid = PidController::from(ShooterGains {
            kp: 2.0,
            ki: 0.0,
            kd: 0.0,
        });
        pid.set_setpoint(3.0);
        assert!((pid.calculate(1.0) - 4.0).abs() < 1e-4);
    }
}
