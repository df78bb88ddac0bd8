//! Intake roller subsystem.
//!
//! Drives a single motor open loop at a fixed voltage for a fixed time to
//! pull a note in or push it out. The motor is returned to 0 V whenever the
//! command ends, whether it timed out or was interrupted.

use core::cell::RefCell;

use embassy_time::Duration;

use super::Actuator;
use crate::{
    constants::intake::{INTAKE_TIMEOUT, INTAKE_VOLTS, OUTTAKE_TIMEOUT, OUTTAKE_VOLTS},
    utils::command::{run_end, Command, CommandExt, Subsystem, SubsystemId},
};

pub struct Intake<'a, M> {
    motor: &'a RefCell<M>,
    id: SubsystemId,
}

impl<'a, M> Intake<'a, M>
where
    M: Actuator + 'a,
{
    pub fn new(motor: &'a RefCell<M>) -> Self {
        Intake {
            motor,
            id: SubsystemId::allocate(),
        }
    }

    /// Run the rollers inward for two seconds.
    pub fn intake(&self) -> impl Command + 'a {
        self.drive_for(INTAKE_VOLTS, INTAKE_TIMEOUT)
    }

    /// Run the rollers outward for four seconds.
    pub fn outtake(&self) -> impl Command + 'a {
        self.drive_for(OUTTAKE_VOLTS, OUTTAKE_TIMEOUT)
    }

    /// Feed a held note into the shooter. Same as [`Intake::intake`].
    pub fn pass(&self) -> impl Command + 'a {
        self.intake()
    }

    fn drive_for(
        &self,
        volts: f32,
        timeout: Duration,
    ) -> impl Command + 'a {
        let motor = self.motor;
        run_end(move || drive(motor, volts), move || drive(motor, 0.0))
            .with_timeout(timeout)
            .requiring(self.id)
    }
}

impl<M> Subsystem for Intake<'_, M> {
    fn id(&self) -> SubsystemId {
        self.id
    }
}

fn drive<M: Actuator>(
    motor: &RefCell<M>,
    volts: f32,
) {
    if let Err(error) = motor.borrow_mut().set_voltage(volts) {
        tracing::error!(?error, volts, "intake voltage command failed");
    }
}
