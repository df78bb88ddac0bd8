//! Math utilities for the Crescendo robot.
//!
//! This module provides the unit conversions used by the shooter velocity loop.

pub mod units;
