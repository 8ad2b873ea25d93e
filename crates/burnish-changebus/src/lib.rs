//! Change-event fan-out between the shared store and its observers.

pub mod bus;
pub mod envelope;

pub use bus::{
    StoreChangeBus, StoreChangeBusConfig, DEFAULT_CHANGE_BUFFER_CAPACITY,
    DEFAULT_TICK_BUFFER_CAPACITY,
};
pub use envelope::StoreChangeEnvelope;
