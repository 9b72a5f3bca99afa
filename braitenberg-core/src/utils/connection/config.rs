//! Session configuration.
//!
//! Connection settings and the names the driver looks up in the scene. Every
//! field has a default matching the reference Pioneer P3-DX scene, so a JSON
//! document only needs the keys it changes.

use alloc::string::{String, ToString};

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

/// Names of the five scene objects the driver resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityNames {
    pub robot: String,
    pub left_motor: String,
    pub right_motor: String,
    pub left_sensor: String,
    pub right_sensor: String,
}

impl Default for EntityNames {
    fn default() -> Self {
        Self {
            robot: "Pioneer_p3dx".to_string(),
            left_motor: "Pioneer_p3dx_leftMotor".to_string(),
            right_motor: "Pioneer_p3dx_rightMotor".to_string(),
            left_sensor: "Pioneer_p3dx_leftVisionSensor".to_string(),
            right_sensor: "Pioneer_p3dx_rightVisionSensor".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub address: String,
    pub port: u16,
    /// Connect timeout, also the bound on every blocking round-trip.
    pub timeout_ms: u64,
    /// Height the robot body is placed at (m).
    pub ground_clearance: f32,
    pub entities: EntityNames,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 19997,
            timeout_ms: 5000,
            ground_clearance: 0.14,
            entities: EntityNames::default(),
        }
    }
}

impl SessionConfig {
    /// Parse a possibly partial JSON document; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_scene() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.address, "127.0.0.1");
        assert_eq!(cfg.port, 19997);
        assert_eq!(cfg.timeout(), Duration::from_millis(5000));
        assert_eq!(cfg.entities.robot, "Pioneer_p3dx");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = SessionConfig::from_json(
            r#"{ "port": 20000, "entities": { "robot": "Vehicle" } }"#,
        )
        .unwrap();
        assert_eq!(cfg.port, 20000);
        assert_eq!(cfg.address, "127.0.0.1");
        assert_eq!(cfg.entities.robot, "Vehicle");
        assert_eq!(cfg.entities.left_motor, "Pioneer_p3dx_leftMotor");
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        assert!(SessionConfig::from_json("{ \"port\": \"high\" }").is_err());
    }
}
