//! Intake and shooter subsystems for the Crescendo robot, with the small
//! command runtime they are scheduled on.
//!
//! For a runnable simulation, see the `crescendo-app/sim-robot` crate.
#![no_std]

extern crate alloc;

pub mod constants;
pub mod utils;
