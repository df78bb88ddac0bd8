//! Motor-facing controllers and subsystems.
//!
//! - `actuator`: the [`Actuator`] trait and an H-bridge driver
//! - `pid`: the [`Feedback`] trait and a discrete [`PidController`]
//! - `intake`: timed open-loop roller commands
//! - `shooter`: closed-loop flywheel commands and readiness trigger

pub mod actuator;
pub mod intake;
pub mod pid;
pub mod shooter;

pub use actuator::{Actuator, HBridgeMotor, MotorError};
pub use intake::Intake;
pub use pid::{Feedback, PidController};
pub use shooter::Shooter;
