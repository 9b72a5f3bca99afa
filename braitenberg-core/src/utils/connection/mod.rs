//! Module Exports
//!
//! This file exports the modules that talk to the simulator.
//!
//! # Modules
//! - `backend`: the `SimBackend` contract a simulator connection must provide.
//! - `config`: connection settings and scene entity names.
//! - `session`: the stepped session driver and its teardown guard.

pub mod backend;
pub mod config;
pub mod session;

pub use backend::{BackendError, ClientId, EntityHandle, ReferenceFrame, SimBackend};
pub use config::{EntityNames, SessionConfig};
pub use session::{Position, Session, SessionError, SessionState, Trajectory};
