//! Math utilities for the Braitenberg vehicle.
//!
//! Sensor value decoding and kinematics for a two-wheeled differential robot.

pub mod intensity;
pub mod kinematics;
