//! Flywheel shooter subsystem.
//!
//! Closes a PID velocity loop on one motor. The flywheel motor is mounted
//! inverted, so the loop negates the encoder velocity before feeding it to
//! the evaluator.

use alloc::rc::Rc;
use core::cell::RefCell;

use super::{
    pid::{Feedback, PidController},
    Actuator,
};
use crate::{
    constants::shooter::{ShooterGains, POSITION_KEY, VELOCITY_KEY},
    utils::{
        command::{run, run_once, Command, CommandExt, Subsystem, SubsystemId, Trigger},
        math::units::rpm_to_rad_per_sec,
        telemetry::Telemetry,
    },
};

pub struct Shooter<'a, M, T, C = PidController> {
    motor: &'a RefCell<M>,
    pid: Rc<RefCell<C>>,
    telemetry: RefCell<T>,
    id: SubsystemId,
}

impl<'a, M, T> Shooter<'a, M, T, PidController>
where
    M: Actuator + 'a,
    T: Telemetry,
{
    /// Creates a shooter with a PID loop built from `gains`.
    pub fn new(
        motor: &'a RefCell<M>,
        gains: ShooterGains,
        telemetry: T,
    ) -> Self {
        Self::with_feedback(motor, PidController::from(gains), telemetry)
    }
}

impl<'a, M, T, C> Shooter<'a, M, T, C>
where
    M: Actuator + 'a,
    T: Telemetry,
    C: Feedback + 'a,
{
    pub fn with_feedback(
        motor: &'a RefCell<M>,
        feedback: C,
        telemetry: T,
    ) -> Self {
        let shooter = Shooter {
            motor,
            pid: Rc::new(RefCell::new(feedback)),
            telemetry: RefCell::new(telemetry),
            id: SubsystemId::allocate(),
        };
        shooter.record_encoder();
        shooter
    }

    /// Reaches and holds `speed` (rad/s). Never finishes on its own.
    ///
    /// The evaluator is reset and retargeted when the command is built, not
    /// when it is scheduled.
    fn achieve_speeds(
        &self,
        speed: f32,
    ) -> impl Command + 'a {
        {
            let mut pid = self.pid.borrow_mut();
            pid.reset();
            pid.set_setpoint(speed);
        }
        tracing::debug!(speed, "shooter setpoint");

        let motor = self.motor;
        let pid = Rc::clone(&self.pid);
        run(move || {
            let rpm = motor.borrow().velocity();
            let volts = pid.borrow_mut().calculate(-rpm_to_rad_per_sec(rpm));
            if let Err(error) = motor.borrow_mut().set_voltage(volts) {
                tracing::error!(?error, volts, "shooter voltage command failed");
            }
        })
        .requiring(self.id)
    }

    /// Speeds up the shooter until the loop reports it is at `speed` (rad/s).
    pub fn spinup(
        &self,
        speed: f32,
    ) -> impl Command + 'a {
        let pid = Rc::clone(&self.pid);
        self.achieve_speeds(speed)
            .until(move || pid.borrow().at_setpoint())
    }

    /// Zero the motor's drive fraction. Finishes immediately.
    pub fn stop(&self) -> impl Command + 'a {
        let motor = self.motor;
        run_once(move || {
            if let Err(error) = motor.borrow_mut().set(0.0) {
                tracing::error!(?error, "shooter stop failed");
            }
        })
        .requiring(self.id)
    }

    /// Holds the shooter at the current setpoint until interrupted.
    pub fn maintain(&self) -> impl Command + 'a {
        let setpoint = self.pid.borrow().setpoint();
        self.achieve_speeds(setpoint)
    }

    /// True when the setpoint exactly equals the measured speed and the loop
    /// reports it is at setpoint.
    ///
    /// The equality compares against the *un-negated* encoder speed while the
    /// loop itself sees the negated value, and an exact float comparison
    /// against a live reading almost never holds. In practice this is only
    /// true at a setpoint of zero with the wheel stopped.
    pub fn at_setpoint(&self) -> Trigger<'a> {
        let motor = self.motor;
        let pid = Rc::clone(&self.pid);
        Trigger::new(move || {
            let pid = pid.borrow();
            pid.setpoint() == rpm_to_rad_per_sec(motor.borrow().velocity()) && pid.at_setpoint()
        })
    }

    /// Current loop target in rad/s.
    pub fn setpoint(&self) -> f32 {
        self.pid.borrow().setpoint()
    }

    fn record_encoder(&self) {
        let (velocity, position) = {
            let motor = self.motor.borrow();
            (motor.velocity(), motor.position())
        };
        let mut telemetry = self.telemetry.borrow_mut();
        telemetry.record(VELOCITY_KEY, velocity);
        telemetry.record(POSITION_KEY, position);
    }
}

impl<'a, M, T, C> Subsystem for Shooter<'a, M, T, C>
where
    M: Actuator + 'a,
    T: Telemetry,
    C: Feedback + 'a,
{
    fn id(&self) -> SubsystemId {
        self.id
    }

    fn periodic(&self) {
        self.record_encoder();
    }
}
