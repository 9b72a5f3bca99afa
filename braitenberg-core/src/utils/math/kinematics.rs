//! Kinematics utilities for two-wheeled differential-drive robots.
//!
//! The `DifferentialKinematics` struct maps wheel angular velocities to body
//! velocities and integrates them into a planar pose.
//!
//! # Example
//! ```rust
//! use braitenberg_core::utils::math::kinematics::{DifferentialKinematics, Pose};
//! let kin = DifferentialKinematics::new(0.0975, 0.331);
//! let next = kin.integrate(Pose::default(), 10.0, 10.0, 0.05);
//! assert!(next.x > 0.0);
//! ```
use libm;
use serde::{Deserialize, Serialize};

/// Planar pose: position in metres, heading in radians (0 = +X, CCW positive).
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub theta: f32,
}

impl Pose {
    pub fn new(
        x: f32,
        y: f32,
        theta: f32,
    ) -> Self {
        Self { x, y, theta }
    }
}

/// Represents the kinematics of a two-wheeled differential robot.
#[derive(Debug, Clone, Copy)]
pub struct DifferentialKinematics {
    /// Radius of each drive wheel (m)
    wheel_radius: f32,
    /// Distance between the two wheel contact points (m)
    axle_track: f32,
}

impl DifferentialKinematics {
    /// Instantiate with a given wheel radius and axle track.
    pub fn new(
        wheel_radius: f32,
        axle_track: f32,
    ) -> Self {
        Self {
            wheel_radius,
            axle_track,
        }
    }

    /// Recover body velocities from wheel angular velocities (rad/s).
    ///
    /// # Returns
    ///
    /// `(v, ω)` where `v` is forward speed (m/s) and `ω` is yaw rate (rad/s).
    pub fn body_velocity(
        &self,
        left: f32,
        right: f32,
    ) -> (f32, f32) {
        let vl = left * self.wheel_radius;
        let vr = right * self.wheel_radius;
        ((vl + vr) / 2.0, (vr - vl) / self.axle_track)
    }

    /// Advance `pose` by `dt` seconds under constant wheel velocities.
    ///
    /// Uses the midpoint heading for the translation, which is exact for
    /// straight lines and close enough for the short steps of a stepped simulator.
    pub fn integrate(
        &self,
        pose: Pose,
        left: f32,
        right: f32,
        dt: f32,
    ) -> Pose {
        let (v, w) = self.body_velocity(left, right);
        let mid = pose.theta + w * dt / 2.0;
        Pose {
            x: pose.x + v * dt * libm::cosf(mid),
            y: pose.y + v * dt * libm::sinf(mid),
            theta: wrap_angle(pose.theta + w * dt),
        }
    }

    /// World positions of a left/right sensor pair mounted `forward` metres ahead
    /// of the body centre and `lateral` metres to each side.
    pub fn sensor_positions(
        pose: Pose,
        forward: f32,
        lateral: f32,
    ) -> ((f32, f32), (f32, f32)) {
        let (s, c) = (libm::sinf(pose.theta), libm::cosf(pose.theta));
        let fx = pose.x + forward * c;
        let fy = pose.y + forward * s;
        // left is +90° from heading
        let left = (fx - lateral * s, fy + lateral * c);
        let right = (fx + lateral * s, fy - lateral * c);
        (left, right)
    }
}

/// Wrap an angle into `(-π, π]`.
fn wrap_angle(a: f32) -> f32 {
    use core::f32::consts::PI;
    let mut r = libm::fmodf(a + PI, 2.0 * PI);
    if r <= 0.0 {
        r += 2.0 * PI;
    }
    r - PI
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::PI;

    #[test]
    fn test_body_velocity_straight() {
        let kin = DifferentialKinematics::new(0.1, 0.3);
        let (v, w) = kin.body_velocity(10.0, 10.0);
        assert!((v - 1.0).abs() < 1e-6);
        assert!(w.abs() < 1e-6);
    }

    #[test]
    fn test_body_velocity_spin_in_place() {
        let kin = DifferentialKinematics::new(0.1, 0.2);
        let (v, w) = kin.body_velocity(-1.0, 1.0);
        assert!(v.abs() < 1e-6);
        assert!((w - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_integrate_zero_is_stationary() {
        let kin = DifferentialKinematics::new(0.0975, 0.331);
        let start = Pose::new(1.0, -2.0, 0.5);
        let next = kin.integrate(start, 0.0, 0.0, 0.05);
        assert!((next.x - start.x).abs() < 1e-6);
        assert!((next.y - start.y).abs() < 1e-6);
        assert!((next.theta - start.theta).abs() < 1e-6);
    }

    #[test]
    fn test_integrate_follows_heading() {
        let kin = DifferentialKinematics::new(0.1, 0.3);
        let next = kin.integrate(Pose::new(0.0, 0.0, PI / 2.0), 10.0, 10.0, 0.5);
        assert!(next.x.abs() < 1e-5);
        assert!((next.y - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-5);
        assert!((wrap_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-5);
        assert!((wrap_angle(0.25) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_sensor_positions_facing_x() {
        let ((lx, ly), (rx, ry)) =
            DifferentialKinematics::sensor_positions(Pose::default(), 0.2, 0.1);
        assert!((lx - 0.2).abs() < 1e-6 && (ly - 0.1).abs() < 1e-6);
        assert!((rx - 0.2).abs() < 1e-6 && (ry + 0.1).abs() < 1e-6);
    }
}
