//! Controller policies for the Braitenberg vehicle.
//!
//! A policy maps the two decoded light intensities to the two wheel velocity
//! commands. It is invoked once per simulation step and must be a pure function
//! of its inputs.
//!
//! - `braitenberg`: the classic vehicle wirings, including the inhibitory
//!   same-side reference law.

pub mod braitenberg;

pub use braitenberg::{Braitenberg, Polarity, Wiring};

/// Maps `(left, right)` intensities in `[0, 255]` to `(left, right)` wheel speeds.
///
/// Implemented for any `Fn(f32, f32) -> (f32, f32)`, so closures plug in directly.
pub trait ControllerPolicy {
    fn compute(
        &self,
        left: f32,
        right: f32,
    ) -> (f32, f32);
}

impl<F> ControllerPolicy for F
where
    F: Fn(f32, f32) -> (f32, f32),
{
    fn compute(
        &self,
        left: f32,
        right: f32,
    ) -> (f32, f32) {
        self(left, right)
    }
}
