//! Simulation backend contract.
//!
//! A `SimBackend` is a client of a stepped simulator. Calls come in three
//! flavours and the driver relies on each behaving as documented:
//!
//! - fire-and-forget: queued and returned immediately (`set_position`,
//!   `set_orientation`)
//! - blocking: returns once the simulator acknowledged (`set_motor_velocity`,
//!   `advance_step`, `start_simulation`, `stop_simulation`)
//! - buffered pull: returns the latest streamed sample without waiting
//!   (`read_buffered`, `read_buffered_pose`), valid only after the matching
//!   `begin_streaming*` call

use alloc::string::String;

use embassy_time::Duration;
use thiserror::Error;

/// Identifier of one connection to the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub i32);

/// Identifier of an object in the simulated scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle(pub i32);

/// Frame a position or orientation is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceFrame {
    World,
    Relative(EntityHandle),
}

/// Errors a simulator connection can report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("simulator unreachable at {address}:{port}")]
    Unreachable { address: String, port: u16 },
    #[error("no entity named `{0}` in the scene")]
    UnknownEntity(String),
    #[error("simulator did not answer within {0:?}")]
    Timeout(Duration),
    #[error("client is not connected")]
    NotConnected,
    #[error("simulator rejected the call: {0}")]
    Remote(String),
}

/// Operations the session driver needs from a simulator connection.
///
/// Implementations must not panic: a session may call into the backend from
/// `Drop` during unwinding, where a second panic aborts the process.
pub trait SimBackend {
    /// Open a connection. `timeout` also bounds every blocking round-trip.
    fn connect(
        &mut self,
        address: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<ClientId, BackendError>;

    /// Advance simulated time only on `advance_step` when enabled.
    fn set_stepped_mode(
        &mut self,
        client: ClientId,
        enabled: bool,
    ) -> Result<(), BackendError>;

    fn resolve_entity(
        &mut self,
        client: ClientId,
        name: &str,
    ) -> Result<EntityHandle, BackendError>;

    /// Fire-and-forget.
    fn set_position(
        &mut self,
        client: ClientId,
        entity: EntityHandle,
        frame: ReferenceFrame,
        position: [f32; 3],
    ) -> Result<(), BackendError>;

    /// Fire-and-forget. Euler angles in radians.
    fn set_orientation(
        &mut self,
        client: ClientId,
        entity: EntityHandle,
        frame: ReferenceFrame,
        euler: [f32; 3],
    ) -> Result<(), BackendError>;

    fn start_simulation(
        &mut self,
        client: ClientId,
    ) -> Result<(), BackendError>;

    fn stop_simulation(
        &mut self,
        client: ClientId,
    ) -> Result<(), BackendError>;

    /// Prime the sensor's streaming channel.
    fn begin_streaming(
        &mut self,
        client: ClientId,
        sensor: EntityHandle,
    ) -> Result<(), BackendError>;

    /// Latest raw intensity byte, possibly wrapped negative.
    fn read_buffered(
        &mut self,
        client: ClientId,
        sensor: EntityHandle,
    ) -> Result<i16, BackendError>;

    /// Prime the entity's pose streaming channel.
    fn begin_streaming_pose(
        &mut self,
        client: ClientId,
        entity: EntityHandle,
    ) -> Result<(), BackendError>;

    /// Latest world position `[x, y, z]`.
    fn read_buffered_pose(
        &mut self,
        client: ClientId,
        entity: EntityHandle,
    ) -> Result<[f32; 3], BackendError>;

    /// Blocking. Target angular velocity of a joint.
    fn set_motor_velocity(
        &mut self,
        client: ClientId,
        motor: EntityHandle,
        velocity: f32,
    ) -> Result<(), BackendError>;

    /// Trigger one step and wait until the simulator finished it.
    fn advance_step(
        &mut self,
        client: ClientId,
    ) -> Result<(), BackendError>;

    fn disconnect(
        &mut self,
        client: ClientId,
    );
}
