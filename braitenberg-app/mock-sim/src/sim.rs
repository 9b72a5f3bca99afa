//! In-process stand-in for the stepped simulator.
//!
//! Models a differential-drive robot in a plane lit by one point light. Time only
//! moves on `advance_step`; streamed samples are refreshed after every step and
//! read back without blocking. Sensor bytes are sent signed, so bright readings
//! arrive wrapped negative just like the reference scene's vision sensors.

use std::collections::HashSet;

use braitenberg_core::utils::{
    connection::{BackendError, ClientId, EntityHandle, EntityNames, ReferenceFrame, SimBackend},
    dk,
    math::{intensity, kinematics::Pose},
    Duration,
};
use tracing::{debug, info};

/// Simulated time per step (s).
const STEP_DT: f32 = 0.05;
/// Pioneer P3-DX wheel radius (m).
const WHEEL_RADIUS: f32 = 0.0975;
/// Pioneer P3-DX axle track (m).
const AXLE_TRACK: f32 = 0.331;
/// Sensor mount offsets from the body centre (m).
const SENSOR_FORWARD: f32 = 0.2;
const SENSOR_LATERAL: f32 = 0.1;

const ROBOT: i32 = 1;
const LEFT_MOTOR: i32 = 2;
const RIGHT_MOTOR: i32 = 3;
const LEFT_SENSOR: i32 = 4;
const RIGHT_SENSOR: i32 = 5;

/// A point light; intensity falls to half at `spread` metres.
#[derive(Debug, Clone, Copy)]
pub struct Light {
    pub x: f32,
    pub y: f32,
    pub spread: f32,
}

impl Light {
    fn intensity_at(
        &self,
        (x, y): (f32, f32),
    ) -> u8 {
        let d2 = (x - self.x).powi(2) + (y - self.y).powi(2);
        let falloff = 1.0 / (1.0 + d2 / (self.spread * self.spread));
        (falloff * intensity::MAX_INTENSITY as f32).round() as u8
    }
}

pub struct MockSimulator {
    port: u16,
    scene: Vec<(String, i32)>,
    light: Light,
    kinematics: dk,
    client: Option<ClientId>,
    next_client: i32,
    stepped: bool,
    running: bool,
    pose: Pose,
    z: f32,
    pending_position: Option<[f32; 3]>,
    pending_heading: Option<f32>,
    wheels: [f32; 2],
    streaming: HashSet<i32>,
    sensors: [u8; 2],
    time: f32,
}

impl MockSimulator {
    /// A simulator accepting connections on `port` whose scene uses `names`.
    pub fn new(
        port: u16,
        names: &EntityNames,
        light: Light,
    ) -> Self {
        let scene = vec![
            (names.robot.clone(), ROBOT),
            (names.left_motor.clone(), LEFT_MOTOR),
            (names.right_motor.clone(), RIGHT_MOTOR),
            (names.left_sensor.clone(), LEFT_SENSOR),
            (names.right_sensor.clone(), RIGHT_SENSOR),
        ];
        let mut sim = MockSimulator {
            port,
            scene,
            light,
            kinematics: dk::new(WHEEL_RADIUS, AXLE_TRACK),
            client: None,
            next_client: 0,
            stepped: false,
            running: false,
            pose: Pose::default(),
            z: 0.0,
            pending_position: None,
            pending_heading: None,
            wheels: [0.0; 2],
            streaming: HashSet::new(),
            sensors: [0; 2],
            time: 0.0,
        };
        sim.refresh();
        sim
    }

    fn check(
        &self,
        client: ClientId,
    ) -> Result<(), BackendError> {
        match self.client {
            Some(c) if c == client => Ok(()),
            _ => Err(BackendError::NotConnected),
        }
    }

    fn check_entity(
        &self,
        entity: EntityHandle,
        expected: &[i32],
    ) -> Result<(), BackendError> {
        if expected.contains(&entity.0) {
            Ok(())
        } else {
            Err(BackendError::Remote(format!("handle {} has no such property", entity.0)))
        }
    }

    fn check_streaming(
        &self,
        entity: EntityHandle,
    ) -> Result<(), BackendError> {
        if self.streaming.contains(&entity.0) {
            Ok(())
        } else {
            Err(BackendError::Remote(format!("no buffered data for handle {}", entity.0)))
        }
    }

    /// Apply queued fire-and-forget commands.
    fn settle(&mut self) {
        if let Some([x, y, z]) = self.pending_position.take() {
            self.pose.x = x;
            self.pose.y = y;
            self.z = z;
        }
        if let Some(theta) = self.pending_heading.take() {
            self.pose.theta = theta;
        }
    }

    /// Resample both sensors at the current pose.
    fn refresh(&mut self) {
        let (left, right) = dk::sensor_positions(self.pose, SENSOR_FORWARD, SENSOR_LATERAL);
        self.sensors = [self.light.intensity_at(left), self.light.intensity_at(right)];
    }
}

impl SimBackend for MockSimulator {
    fn connect(
        &mut self,
        address: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<ClientId, BackendError> {
        if port != self.port {
            return Err(BackendError::Unreachable {
                address: address.to_string(),
                port,
            });
        }
        let client = ClientId(self.next_client);
        self.next_client += 1;
        self.client = Some(client);
        info!(client = client.0, ?timeout, "mock simulator accepted client");
        Ok(client)
    }

    fn set_stepped_mode(
        &mut self,
        client: ClientId,
        enabled: bool,
    ) -> Result<(), BackendError> {
        self.check(client)?;
        self.stepped = enabled;
        Ok(())
    }

    fn resolve_entity(
        &mut self,
        client: ClientId,
        name: &str,
    ) -> Result<EntityHandle, BackendError> {
        self.check(client)?;
        self.scene
            .iter()
            .find(|(n, _)| n == name)
            .map(|&(_, h)| EntityHandle(h))
            .ok_or_else(|| BackendError::UnknownEntity(name.to_string()))
    }

    fn set_position(
        &mut self,
        client: ClientId,
        entity: EntityHandle,
        frame: ReferenceFrame,
        position: [f32; 3],
    ) -> Result<(), BackendError> {
        self.check(client)?;
        self.check_entity(entity, &[ROBOT])?;
        if frame != ReferenceFrame::World {
            return Err(BackendError::Remote("only world frame is supported".into()));
        }
        self.pending_position = Some(position);
        Ok(())
    }

    fn set_orientation(
        &mut self,
        client: ClientId,
        entity: EntityHandle,
        frame: ReferenceFrame,
        euler: [f32; 3],
    ) -> Result<(), BackendError> {
        self.check(client)?;
        self.check_entity(entity, &[ROBOT])?;
        if frame != ReferenceFrame::World {
            return Err(BackendError::Remote("only world frame is supported".into()));
        }
        // planar robot: only yaw matters
        self.pending_heading = Some(euler[2]);
        Ok(())
    }

    fn start_simulation(
        &mut self,
        client: ClientId,
    ) -> Result<(), BackendError> {
        self.check(client)?;
        self.running = true;
        self.time = 0.0;
        self.settle();
        self.refresh();
        info!(pose = ?self.pose, "simulation started");
        Ok(())
    }

    fn stop_simulation(
        &mut self,
        client: ClientId,
    ) -> Result<(), BackendError> {
        self.check(client)?;
        self.running = false;
        self.wheels = [0.0; 2];
        info!(time = self.time, "simulation stopped");
        Ok(())
    }

    fn begin_streaming(
        &mut self,
        client: ClientId,
        sensor: EntityHandle,
    ) -> Result<(), BackendError> {
        self.check(client)?;
        self.check_entity(sensor, &[LEFT_SENSOR, RIGHT_SENSOR])?;
        self.streaming.insert(sensor.0);
        Ok(())
    }

    fn read_buffered(
        &mut self,
        client: ClientId,
        sensor: EntityHandle,
    ) -> Result<i16, BackendError> {
        self.check(client)?;
        self.check_entity(sensor, &[LEFT_SENSOR, RIGHT_SENSOR])?;
        self.check_streaming(sensor)?;
        let value = if sensor.0 == LEFT_SENSOR {
            self.sensors[0]
        } else {
            self.sensors[1]
        };
        Ok(intensity::encode(value))
    }

    fn begin_streaming_pose(
        &mut self,
        client: ClientId,
        entity: EntityHandle,
    ) -> Result<(), BackendError> {
        self.check(client)?;
        self.check_entity(entity, &[ROBOT])?;
        self.streaming.insert(entity.0);
        Ok(())
    }

    fn read_buffered_pose(
        &mut self,
        client: ClientId,
        entity: EntityHandle,
    ) -> Result<[f32; 3], BackendError> {
        self.check(client)?;
        self.check_entity(entity, &[ROBOT])?;
        self.check_streaming(entity)?;
        Ok([self.pose.x, self.pose.y, self.z])
    }

    fn set_motor_velocity(
        &mut self,
        client: ClientId,
        motor: EntityHandle,
        velocity: f32,
    ) -> Result<(), BackendError> {
        self.check(client)?;
        self.check_entity(motor, &[LEFT_MOTOR, RIGHT_MOTOR])?;
        let wheel = if motor.0 == LEFT_MOTOR { 0 } else { 1 };
        self.wheels[wheel] = velocity;
        Ok(())
    }

    fn advance_step(
        &mut self,
        client: ClientId,
    ) -> Result<(), BackendError> {
        self.check(client)?;
        if !self.stepped {
            return Err(BackendError::Remote("stepped mode is disabled".into()));
        }
        if !self.running {
            // nothing to advance, but the trigger is still acknowledged
            return Ok(());
        }
        self.settle();
        self.pose = self
            .kinematics
            .integrate(self.pose, self.wheels[0], self.wheels[1], STEP_DT);
        self.time += STEP_DT;
        self.refresh();
        debug!(time = self.time, pose = ?self.pose, sensors = ?self.sensors, "stepped");
        Ok(())
    }

    fn disconnect(
        &mut self,
        client: ClientId,
    ) {
        if self.check(client).is_ok() {
            self.client = None;
            self.streaming.clear();
            info!(client = client.0, "mock simulator dropped client");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use braitenberg_core::utils::{run, Braitenberg, SessionConfig};

    fn sim(config: &SessionConfig) -> MockSimulator {
        MockSimulator::new(
            config.port,
            &config.entities,
            Light {
                x: 2.0,
                y: 0.0,
                spread: 1.0,
            },
        )
    }

    #[test]
    fn test_light_falls_off_with_distance() {
        let light = Light {
            x: 0.0,
            y: 0.0,
            spread: 1.0,
        };
        assert_eq!(light.intensity_at((0.0, 0.0)), 255);
        assert_eq!(light.intensity_at((1.0, 0.0)), 128);
        assert!(light.intensity_at((5.0, 0.0)) < 20);
    }

    #[test]
    fn test_wrong_port_is_unreachable() {
        let config = SessionConfig::default();
        let mut sim = sim(&config);
        let err = sim
            .connect("127.0.0.1", config.port + 1, config.timeout())
            .unwrap_err();
        assert!(matches!(err, BackendError::Unreachable { .. }));
    }

    #[test]
    fn test_unprimed_read_is_rejected() {
        let config = SessionConfig::default();
        let mut sim = sim(&config);
        let client = sim.connect("127.0.0.1", config.port, config.timeout()).unwrap();
        let err = sim.read_buffered(client, EntityHandle(LEFT_SENSOR)).unwrap_err();
        assert!(matches!(err, BackendError::Remote(_)));
    }

    #[test]
    fn test_relative_placement_is_rejected() {
        let config = SessionConfig::default();
        let mut sim = sim(&config);
        let client = sim.connect("127.0.0.1", config.port, config.timeout()).unwrap();
        let robot = EntityHandle(ROBOT);
        let frame = ReferenceFrame::Relative(EntityHandle(LEFT_SENSOR));
        assert!(matches!(
            sim.set_position(client, robot, frame, [1.0, 1.0, 0.14]),
            Err(BackendError::Remote(_))
        ));
        assert!(matches!(
            sim.set_orientation(client, robot, frame, [0.0, 0.0, 1.0]),
            Err(BackendError::Remote(_))
        ));
        assert!(sim.pending_position.is_none());
        assert!(sim.pending_heading.is_none());
    }

    #[test]
    fn test_inhibitory_vehicle_slows_near_light() {
        let config = SessionConfig::default();
        let mut sim = sim(&config);
        let trajectory = run(
            &mut sim,
            &config,
            Pose::new(0.0, 0.0, 0.0),
            40,
            &Braitenberg::default(),
        )
        .unwrap();
        assert_eq!(trajectory.len(), 40);

        let samples = trajectory.as_slice();
        let first = samples[1].x - samples[0].x;
        let last = samples[39].x - samples[38].x;
        assert!(first > 0.0, "vehicle should move towards +x");
        assert!(last < first, "vehicle should slow down approaching the light");
        assert!(samples[39].x < 2.0);
        assert!(!sim.running);
        assert!(sim.client.is_none());
    }
}
