//! Braitenberg vehicle control laws.
//!
//! Each wheel speed is a linear function of one sensor's intensity. The sensor
//! is either on the same side as the wheel (`Ipsilateral`) or the opposite side
//! (`Contralateral`), and the connection either increases speed with light
//! (`Excitatory`) or decreases it (`Inhibitory`).

use serde::{Deserialize, Serialize};

use super::ControllerPolicy;
use crate::utils::math::intensity::MAX_INTENSITY;

/// Wheel speed produced at full excitation.
pub const TOP_SPEED: f32 = 30.0;

/// Gain of the reference law: zero intensity maps to `TOP_SPEED`, full intensity to zero.
pub const DEFAULT_GAIN: f32 = TOP_SPEED / MAX_INTENSITY as f32;

/// Which sensor drives each wheel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wiring {
    /// Same-side sensor.
    #[default]
    Ipsilateral,
    /// Opposite-side sensor.
    Contralateral,
}

/// Sign of the sensor-to-wheel connection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Speed grows with intensity: `k * i`.
    Excitatory,
    /// Speed falls with intensity: `k * (255 - i)`.
    #[default]
    Inhibitory,
}

/// A stateless Braitenberg controller.
///
/// `Braitenberg::default()` is the inhibitory same-side law with gain `30 / 255`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Braitenberg {
    pub gain: f32,
    pub wiring: Wiring,
    pub polarity: Polarity,
}

impl Default for Braitenberg {
    fn default() -> Self {
        Self {
            gain: DEFAULT_GAIN,
            wiring: Wiring::Ipsilateral,
            polarity: Polarity::Inhibitory,
        }
    }
}

impl Braitenberg {
    pub fn new(
        gain: Option<f32>,
        wiring: Wiring,
        polarity: Polarity,
    ) -> Self {
        Self {
            gain: gain.unwrap_or(DEFAULT_GAIN),
            wiring,
            polarity,
        }
    }

    fn drive(
        &self,
        intensity: f32,
    ) -> f32 {
        match self.polarity {
            Polarity::Excitatory => self.gain * intensity,
            Polarity::Inhibitory => self.gain * (MAX_INTENSITY as f32 - intensity),
        }
    }
}

impl ControllerPolicy for Braitenberg {
    fn compute(
        &self,
        left: f32,
        right: f32,
    ) -> (f32, f32) {
        let (to_left, to_right) = match self.wiring {
            Wiring::Ipsilateral => (left, right),
            Wiring::Contralateral => (right, left),
        };
        (self.drive(to_left), self.drive(to_right))
    }
}
