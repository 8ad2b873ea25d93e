//! The authoritative polish-job state machine.
//!
//! Runs in the long-lived process. Owns every write to the job and history
//! records, issues the remote call, and answers view commands over the
//! request channel. Anything not persisted to the shared store is assumed
//! lost across a restart; `recover` reconciles what survived.

mod context;
pub mod controller;
pub mod handle;

pub use controller::{JobCoordinator, RESTART_FAILURE_MESSAGE};
pub use handle::{
    request_channel, CoordinatorHandle, CoordinatorRequest, DEFAULT_REQUEST_CHANNEL_CAPACITY,
};
