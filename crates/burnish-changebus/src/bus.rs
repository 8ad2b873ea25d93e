use std::sync::atomic::{AtomicU64, Ordering};

use burnish_protocol::message::ProgressTick;
use burnish_protocol::records::{StoreKey, StoreRecord};
use tokio::sync::broadcast;

use crate::envelope::StoreChangeEnvelope;

pub const DEFAULT_CHANGE_BUFFER_CAPACITY: usize = 64;
pub const DEFAULT_TICK_BUFFER_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreChangeBusConfig {
    pub change_buffer_capacity: usize,
    pub tick_buffer_capacity: usize,
}

impl Default for StoreChangeBusConfig {
    fn default() -> Self {
        Self {
            change_buffer_capacity: DEFAULT_CHANGE_BUFFER_CAPACITY,
            tick_buffer_capacity: DEFAULT_TICK_BUFFER_CAPACITY,
        }
    }
}

/// Fan-out point for store mutations plus the advisory tick side channel.
///
/// Change delivery is at-least-once per live subscriber and ordered
/// relative to the single writer of each key; a subscriber that attaches
/// after a write never sees it and must reconcile by reading the store.
/// Ticks are fire-and-forget and silently dropped with no listeners.
#[derive(Debug)]
pub struct StoreChangeBus {
    next_sequence: AtomicU64,
    change_sender: broadcast::Sender<StoreChangeEnvelope>,
    tick_sender: broadcast::Sender<ProgressTick>,
}

impl Default for StoreChangeBus {
    fn default() -> Self {
        Self::new(StoreChangeBusConfig::default())
    }
}

impl StoreChangeBus {
    pub fn new(config: StoreChangeBusConfig) -> Self {
        assert!(
            config.change_buffer_capacity > 0,
            "change_buffer_capacity must be greater than 0"
        );
        assert!(
            config.tick_buffer_capacity > 0,
            "tick_buffer_capacity must be greater than 0"
        );

        let (change_sender, _change_receiver) =
            broadcast::channel(config.change_buffer_capacity);
        let (tick_sender, _tick_receiver) = broadcast::channel(config.tick_buffer_capacity);
        Self {
            next_sequence: AtomicU64::new(0),
            change_sender,
            tick_sender,
        }
    }

    pub fn subscribe_changes(&self) -> broadcast::Receiver<StoreChangeEnvelope> {
        self.change_sender.subscribe()
    }

    pub fn subscribe_ticks(&self) -> broadcast::Receiver<ProgressTick> {
        self.tick_sender.subscribe()
    }

    pub fn publish_change(
        &self,
        key: StoreKey,
        old: Option<StoreRecord>,
        new: Option<StoreRecord>,
    ) -> StoreChangeEnvelope {
        let envelope = StoreChangeEnvelope {
            sequence: self.next_sequence(),
            key,
            old,
            new,
        };
        let _ = self.change_sender.send(envelope.clone());
        envelope
    }

    pub fn publish_tick(&self, tick: ProgressTick) {
        let _ = self.tick_sender.send(tick);
    }

    fn next_sequence(&self) -> u64 {
        let mut current = self.next_sequence.load(Ordering::Relaxed);
        loop {
            let next = current
                .checked_add(1)
                .expect("store change sequence exhausted");
            match self.next_sequence.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(observed) => current = observed,
            }
        }
    }
}
