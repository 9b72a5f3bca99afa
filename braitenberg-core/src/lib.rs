//! Session driver and reactive controllers for a two-wheeled Braitenberg vehicle
//! running inside a stepped simulator, on no-std platforms.
//!
//! For a runnable host program, see `braitenberg-app/mock-sim`.
#![no_std]

extern crate alloc;

pub mod utils;
