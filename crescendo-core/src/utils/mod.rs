//! Utility re-exports for the Crescendo robot.
//!
//! - `command`: commands, combinators, triggers and the cooperative scheduler
//! - `controllers`: actuator and PID abstractions, intake and shooter subsystems
//! - `math`: unit conversions for angular velocity
//! - `sim`: a first-order motor model for host-side runs and tests
//! - `telemetry`: write-only numeric telemetry sinks

pub mod command;
pub mod controllers;
pub mod math;
pub mod sim;
pub mod telemetry;

pub use command::{Command, CommandExt, Scheduler, Subsystem, Trigger};
pub use controllers::{Actuator, Intake, PidController, Shooter};
pub use embassy_time::{Duration, Instant};
