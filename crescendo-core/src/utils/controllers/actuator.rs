//! Motor actuator abstraction and an H-bridge driver over `embedded-hal`.
//!
//! Subsystems only talk to motors through [`Actuator`]. Velocity and position
//! reads are infallible snapshots of the last feedback the controller
//! received; writes report driver faults through `Actuator::Error`.

use embedded_hal::{digital::OutputPin, pwm::SetDutyCycle};

/// One motor that accepts voltage or drive-fraction commands and reports
/// velocity and position.
pub trait Actuator {
    type Error: core::fmt::Debug;

    /// Command the motor output as a voltage.
    fn set_voltage(
        &mut self,
        volts: f32,
    ) -> Result<(), Self::Error>;

    /// Command the motor output as a fraction of full drive in `[-1, 1]`.
    fn set(
        &mut self,
        fraction: f32,
    ) -> Result<(), Self::Error>;

    /// Velocity in revolutions per minute.
    fn velocity(&self) -> f32;

    /// Position in rotations.
    fn position(&self) -> f32;
}

/// Errors raised by [`HBridgeMotor`].
#[derive(Debug)]
pub enum MotorError<P: core::fmt::Debug, D: core::fmt::Debug> {
    PwmError(P),
    DirectionError(D),
}

/// A brushed motor behind an H-bridge: one PWM channel for magnitude and one
/// output pin for direction (high = forward).
///
/// Feedback comes from whatever encoder the board has, pushed in with
/// [`HBridgeMotor::update_feedback`].
pub struct HBridgeMotor<PWM, DIR> {
    pwm: PWM,
    direction: DIR,
    supply_voltage: f32,
    velocity_rpm: f32,
    position_rotations: f32,
}

impl<PWM, DIR> HBridgeMotor<PWM, DIR>
where
    PWM: SetDutyCycle,
    DIR: OutputPin,
{
    /// `supply_voltage` is the bridge supply used to turn volts into duty cycle.
    pub fn new(
        pwm: PWM,
        direction: DIR,
        supply_voltage: f32,
    ) -> Self {
        Self {
            pwm,
            direction,
            supply_voltage,
            velocity_rpm: 0.0,
            position_rotations: 0.0,
        }
    }

    /// Store the latest encoder reading.
    pub fn update_feedback(
        &mut self,
        velocity_rpm: f32,
        position_rotations: f32,
    ) {
        self.velocity_rpm = velocity_rpm;
        self.position_rotations = position_rotations;
    }

    /// Give back the PWM channel and direction pin.
    pub fn release(self) -> (PWM, DIR) {
        (self.pwm, self.direction)
    }
}

impl<PWM, DIR> Actuator for HBridgeMotor<PWM, DIR>
where
    PWM: SetDutyCycle,
    DIR: OutputPin,
{
    type Error = MotorError<PWM::Error, DIR::Error>;

    fn set_voltage(
        &mut self,
        volts: f32,
    ) -> Result<(), Self::Error> {
        self.set(volts / self.supply_voltage)
    }

    fn set(
        &mut self,
        fraction: f32,
    ) -> Result<(), Self::Error> {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(-1.0, 1.0)
        };

        let direction = if fraction >= 0.0 {
            self.direction.set_high()
        } else {
            self.direction.set_low()
        };
        direction.map_err(MotorError::DirectionError)?;

        let max_duty = self.pwm.max_duty_cycle();
        let duty = (libm::fabsf(fraction) * max_duty as f32) as u16;
        self.pwm
            .set_duty_cycle(duty)
            .map_err(MotorError::PwmError)
    }

    fn velocity(&self) -> f32 {
        self.velocity_rpm
    }

    fn position(&self) -> f32 {
        self.position_rotations
    }
}
