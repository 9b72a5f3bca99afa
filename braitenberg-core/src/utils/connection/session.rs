//! Stepped simulation session driver.
//!
//! A `Session` owns one connection to the simulator for the length of a run.
//! It walks the lifecycle
//! `Disconnected → Connected → SynchronousModeSet → EntitiesResolved → Placed →
//! Running → Stopped → Disconnected`, and tears the simulation down exactly once
//! when it is closed or dropped, including while a panic unwinds.
//!
//! Each control step is resolved against a single simulated instant: sensors are
//! read, the policy is evaluated, both motors are commanded, the pose is read,
//! and only then is the simulator advanced.

use alloc::{string::String, vec::Vec};

use embassy_time::{Duration, Instant};
use serde::Serialize;
use thiserror::Error;

use super::{
    backend::{BackendError, ClientId, EntityHandle, ReferenceFrame, SimBackend},
    config::{EntityNames, SessionConfig},
};
use crate::utils::{
    controllers::ControllerPolicy,
    math::{intensity, kinematics::Pose},
};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    SynchronousModeSet,
    EntitiesResolved,
    Placed,
    /// `step` control steps have completed.
    Running { step: usize },
    Stopped,
}

/// Errors that end a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("could not connect to the simulator")]
    Connection(#[source] BackendError),
    #[error("could not resolve scene entity `{name}`")]
    EntityResolution {
        name: String,
        #[source]
        source: BackendError,
    },
    #[error("simulation step was not acknowledged within {bound:?}")]
    StepTimeout { bound: Duration },
    #[error("`{op}` failed")]
    Backend {
        op: &'static str,
        #[source]
        source: BackendError,
    },
    #[error("cannot {op} while the session is {state:?}")]
    InvalidState {
        op: &'static str,
        state: SessionState,
    },
}

/// Robot position sampled after one control step.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// Positions recorded by a run, indexed by step.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Trajectory(Vec<Position>);

impl Trajectory {
    pub fn with_capacity(steps: usize) -> Self {
        Self(Vec::with_capacity(steps))
    }

    pub fn push(
        &mut self,
        sample: Position,
    ) {
        self.0.push(sample);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Position] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Position> {
        self.0
    }
}

/// Handles obtained so far. Teardown uses whichever are present.
#[derive(Debug, Default, Clone, Copy)]
struct Handles {
    robot: Option<EntityHandle>,
    left_motor: Option<EntityHandle>,
    right_motor: Option<EntityHandle>,
    left_sensor: Option<EntityHandle>,
    right_sensor: Option<EntityHandle>,
}

/// Fully resolved handle set, available once the session reached `EntitiesResolved`.
#[derive(Debug, Clone, Copy)]
struct Entities {
    robot: EntityHandle,
    left_motor: EntityHandle,
    right_motor: EntityHandle,
    left_sensor: EntityHandle,
    right_sensor: EntityHandle,
}

impl Handles {
    fn complete(&self) -> Option<Entities> {
        Some(Entities {
            robot: self.robot?,
            left_motor: self.left_motor?,
            right_motor: self.right_motor?,
            left_sensor: self.left_sensor?,
            right_sensor: self.right_sensor?,
        })
    }
}

/// Exclusive, scoped ownership of one simulator connection.
///
/// Teardown runs from `Drop`, possibly while a panic unwinds, so the backend's
/// teardown calls (`set_motor_velocity`, `advance_step`, `stop_simulation`,
/// `disconnect`) must report failures as errors and never panic.
pub struct Session<'a, B: SimBackend> {
    backend: &'a mut B,
    client: Option<ClientId>,
    handles: Handles,
    timeout: Duration,
    state: SessionState,
}

impl<'a, B: SimBackend> Session<'a, B> {
    /// Connect and switch the simulator to stepped mode.
    ///
    /// A connection failure returns before any session exists, so nothing is torn
    /// down. Any later failure tears the fresh connection down again.
    pub fn open(
        backend: &'a mut B,
        config: &SessionConfig,
    ) -> Result<Self, SessionError> {
        let timeout = config.timeout();
        let client = backend
            .connect(&config.address, config.port, timeout)
            .map_err(SessionError::Connection)?;
        tracing::info!(address = %config.address, port = config.port, "connected to simulator");

        let mut session = Session {
            backend,
            client: Some(client),
            handles: Handles::default(),
            timeout,
            state: SessionState::Disconnected,
        };
        session.transition(SessionState::Connected);

        session
            .backend
            .set_stepped_mode(client, true)
            .map_err(backend_error("set_stepped_mode"))?;
        session.transition(SessionState::SynchronousModeSet);
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Look up the robot, its motors and its sensors, in that order.
    ///
    /// Stops at the first unknown name; handles resolved before it are kept for
    /// teardown.
    pub fn resolve(
        &mut self,
        names: &EntityNames,
    ) -> Result<(), SessionError> {
        let client = self.expect(SessionState::SynchronousModeSet, "resolve entities")?;

        self.handles.robot = Some(self.resolve_one(client, &names.robot)?);
        self.handles.left_motor = Some(self.resolve_one(client, &names.left_motor)?);
        self.handles.right_motor = Some(self.resolve_one(client, &names.right_motor)?);
        self.handles.left_sensor = Some(self.resolve_one(client, &names.left_sensor)?);
        self.handles.right_sensor = Some(self.resolve_one(client, &names.right_sensor)?);

        self.transition(SessionState::EntitiesResolved);
        Ok(())
    }

    fn resolve_one(
        &mut self,
        client: ClientId,
        name: &str,
    ) -> Result<EntityHandle, SessionError> {
        let handle = self
            .backend
            .resolve_entity(client, name)
            .map_err(|source| SessionError::EntityResolution {
                name: String::from(name),
                source,
            })?;
        tracing::debug!(entity = name, handle = handle.0, "resolved entity");
        Ok(handle)
    }

    /// Teleport the robot to `start`, lifted to `ground_clearance`.
    ///
    /// Both commands are fire-and-forget; starting the simulation settles them.
    /// The heading is written here once and never touched again.
    pub fn place(
        &mut self,
        start: Pose,
        ground_clearance: f32,
    ) -> Result<(), SessionError> {
        let client = self.expect(SessionState::EntitiesResolved, "place robot")?;
        let robot = self.entities("place robot")?.robot;

        self.backend
            .set_position(
                client,
                robot,
                ReferenceFrame::World,
                [start.x, start.y, ground_clearance],
            )
            .map_err(backend_error("set_position"))?;
        self.backend
            .set_orientation(client, robot, ReferenceFrame::World, [0.0, 0.0, start.theta])
            .map_err(backend_error("set_orientation"))?;

        self.transition(SessionState::Placed);
        Ok(())
    }

    /// Start the simulation, prime the three streaming channels and run the first
    /// step so buffered reads return data.
    pub fn start(&mut self) -> Result<(), SessionError> {
        let client = self.expect(SessionState::Placed, "start simulation")?;
        let e = self.entities("start simulation")?;

        self.backend
            .start_simulation(client)
            .map_err(backend_error("start_simulation"))?;
        self.backend
            .begin_streaming(client, e.left_sensor)
            .map_err(backend_error("begin_streaming"))?;
        self.backend
            .begin_streaming(client, e.right_sensor)
            .map_err(backend_error("begin_streaming"))?;
        self.backend
            .begin_streaming_pose(client, e.robot)
            .map_err(backend_error("begin_streaming_pose"))?;
        self.advance(client)?;

        tracing::info!("simulation started");
        self.transition(SessionState::Running { step: 0 });
        Ok(())
    }

    /// Run one control step and return the robot position observed before the
    /// simulator is advanced.
    pub fn step<C>(
        &mut self,
        controller: &C,
    ) -> Result<Position, SessionError>
    where
        C: ControllerPolicy + ?Sized,
    {
        let (client, step) = match (self.client, self.state) {
            (Some(client), SessionState::Running { step }) => (client, step),
            (_, state) => return Err(SessionError::InvalidState { op: "step", state }),
        };
        let e = self.entities("step")?;

        let raw_left = self
            .backend
            .read_buffered(client, e.left_sensor)
            .map_err(backend_error("read_buffered"))?;
        let raw_right = self
            .backend
            .read_buffered(client, e.right_sensor)
            .map_err(backend_error("read_buffered"))?;
        let left = intensity::decode(raw_left);
        let right = intensity::decode(raw_right);

        let (left_speed, right_speed) = controller.compute(left as f32, right as f32);
        tracing::debug!(step, left, right, left_speed, right_speed, "control step");

        self.backend
            .set_motor_velocity(client, e.left_motor, left_speed)
            .map_err(backend_error("set_motor_velocity"))?;
        self.backend
            .set_motor_velocity(client, e.right_motor, right_speed)
            .map_err(backend_error("set_motor_velocity"))?;

        let [x, y, _] = self
            .backend
            .read_buffered_pose(client, e.robot)
            .map_err(backend_error("read_buffered_pose"))?;

        self.advance(client)?;
        self.transition(SessionState::Running { step: step + 1 });
        Ok(Position { x, y })
    }

    /// Stop the robot and the simulation, then disconnect.
    pub fn close(mut self) {
        self.teardown();
    }

    /// Single synchronization barrier: trigger a step and wait for it.
    fn advance(
        &mut self,
        client: ClientId,
    ) -> Result<(), SessionError> {
        let started = Instant::now();
        match self.backend.advance_step(client) {
            Ok(()) => {}
            Err(BackendError::Timeout(_)) => {
                return Err(SessionError::StepTimeout {
                    bound: self.timeout,
                })
            }
            Err(source) => {
                return Err(SessionError::Backend {
                    op: "advance_step",
                    source,
                })
            }
        }
        let elapsed = started.elapsed();
        if elapsed > self.timeout {
            return Err(SessionError::StepTimeout {
                bound: self.timeout,
            });
        }
        tracing::trace!(elapsed_us = elapsed.as_micros(), "step acknowledged");
        Ok(())
    }

    fn teardown(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };

        for (side, motor) in [
            ("left", self.handles.left_motor),
            ("right", self.handles.right_motor),
        ] {
            if let Some(motor) = motor {
                if let Err(error) = self.backend.set_motor_velocity(client, motor, 0.0) {
                    tracing::warn!(side, %error, "could not stop motor");
                }
            }
        }
        if let Err(error) = self.backend.advance_step(client) {
            tracing::warn!(%error, "final step failed");
        }
        match self.backend.stop_simulation(client) {
            Ok(()) => self.transition(SessionState::Stopped),
            Err(error) => tracing::warn!(%error, "could not stop simulation"),
        }

        self.backend.disconnect(client);
        self.transition(SessionState::Disconnected);
        tracing::info!("disconnected from simulator");
    }

    fn expect(
        &self,
        expected: SessionState,
        op: &'static str,
    ) -> Result<ClientId, SessionError> {
        match self.client {
            Some(client) if self.state == expected => Ok(client),
            _ => Err(SessionError::InvalidState {
                op,
                state: self.state,
            }),
        }
    }

    fn entities(
        &self,
        op: &'static str,
    ) -> Result<Entities, SessionError> {
        self.handles.complete().ok_or(SessionError::InvalidState {
            op,
            state: self.state,
        })
    }

    fn transition(
        &mut self,
        next: SessionState,
    ) {
        tracing::trace!(from = ?self.state, to = ?next, "session state");
        self.state = next;
    }
}

impl<B: SimBackend> Drop for Session<'_, B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn backend_error(op: &'static str) -> impl FnOnce(BackendError) -> SessionError {
    move |source| SessionError::Backend { op, source }
}

/// Drive one episode: connect, place the robot at `start`, run `duration`
/// control steps with `controller`, and return the sampled positions.
///
/// Teardown always runs before this returns, whether the run succeeded, failed,
/// or the controller panicked. Teardown problems are logged and never replace
/// the error being returned.
pub fn run<B, C>(
    backend: &mut B,
    config: &SessionConfig,
    start: Pose,
    duration: usize,
    controller: &C,
) -> Result<Trajectory, SessionError>
where
    B: SimBackend,
    C: ControllerPolicy + ?Sized,
{
    let mut session = Session::open(backend, config)?;
    let outcome = drive(&mut session, config, start, duration, controller);
    session.close();

    match &outcome {
        Ok(trajectory) => tracing::info!(steps = trajectory.len(), "run complete"),
        Err(error) => tracing::error!(%error, "run aborted"),
    }
    outcome
}

fn drive<B, C>(
    session: &mut Session<'_, B>,
    config: &SessionConfig,
    start: Pose,
    duration: usize,
    controller: &C,
) -> Result<Trajectory, SessionError>
where
    B: SimBackend,
    C: ControllerPolicy + ?Sized,
{
    session.resolve(&config.entities)?;
    session.place(start, config.ground_clearance)?;
    session.start()?;

    let mut trajectory = Trajectory::with_capacity(duration);
    for _ in 0..duration {
        trajectory.push(session.step(controller)?);
    }
    Ok(trajectory)
}
