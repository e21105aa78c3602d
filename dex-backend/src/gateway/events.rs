use chrono::Utc;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::broadcast;

use super::protocol::{DexEvent, StampedEvent};

/// Max number of recent events to keep for replay
const EVENT_BUFFER_SIZE: usize = 200;

/// Capacity of the live subscriber channel. Slow subscribers skip ahead.
const SUBSCRIBER_CAPACITY: usize = 1000;

/// Fans events out to WebSocket clients (see [`super::actix_ws`]) and keeps a
/// replay buffer.
///
/// `broadcast()` never blocks and never fails; with no subscribers the event
/// only lands in the buffer.
pub struct EventBroadcaster {
    sender: broadcast::Sender<StampedEvent>,
    recent_events: Mutex<VecDeque<StampedEvent>>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        Self {
            sender,
            recent_events: Mutex::new(VecDeque::with_capacity(EVENT_BUFFER_SIZE)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StampedEvent> {
        self.sender.subscribe()
    }

    pub fn broadcast(&self, event: DexEvent) {
        let stamped = StampedEvent {
            at: Utc::now(),
            event,
        };

        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "[BROADCAST] '{}' to {} subscriber(s)",
                stamped.event.name(),
                self.sender.receiver_count()
            );
        }

        {
            let mut buffer = self.recent_events.lock();
            if buffer.len() >= EVENT_BUFFER_SIZE {
                buffer.pop_front();
            }
            buffer.push_back(stamped.clone());
        }

        // Err only means nobody is listening right now
        let _ = self.sender.send(stamped);
    }

    /// Snapshot of buffered events, oldest first
    pub fn get_recent_events(&self) -> Vec<StampedEvent> {
        self.recent_events.lock().iter().cloned().collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
