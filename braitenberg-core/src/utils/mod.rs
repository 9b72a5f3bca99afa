//! Utility re-exports for the Braitenberg vehicle driver.
//!
//! - `connection`: simulation backend contract, session configuration and the
//!   stepped session driver
//! - `controllers`: controller policies mapping light intensities to wheel speeds
//! - `math`: sensor decoding and differential-drive kinematics

pub mod connection;
pub mod controllers;
pub mod math;

pub use connection::session::run;
pub use connection::{SessionConfig, SimBackend};
pub use controllers::{Braitenberg, ControllerPolicy};
pub use embassy_time::Duration;
pub use math::kinematics::DifferentialKinematics as dk;
