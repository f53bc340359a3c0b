//! Event System
//!
//! Provides a pub/sub event bus so the editor shell can observe the
//! workbench without owning it.

use std::path::PathBuf;
use std::time::Duration;
use parking_lot::RwLock;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use serde::Serialize;
use tracing::trace;

use crate::status::{RunStatus, SessionId};

/// Events emitted by the workbench
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// Buffer text replaced
    BufferEdited { revision: u64 },
    /// A highlight pass was applied to the buffer
    HighlightsApplied { revision: u64, keywords: usize },
    /// A highlight pass finished after the buffer moved on
    HighlightsDiscarded { revision: u64 },
    /// A script process was spawned
    RunStarted { session: SessionId, script_path: PathBuf },
    /// Output chunk from the running script
    RunOutput { session: SessionId, text: String },
    /// The script finished; always the last event of a session
    RunCompleted { session: SessionId, status: RunStatus },
    /// A run could not be started
    RunFailed { message: String },
    /// The output log was cleared
    OutputCleared,
    /// Workbench shutting down
    Shutdown,
}

/// Subscriber handle for receiving events
#[derive(Clone)]
pub struct EventSubscription {
    receiver: Receiver<Event>,
}

impl EventSubscription {
    /// Receive the next event (blocking)
    pub fn recv(&self) -> Result<Event, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv(&self) -> Result<Event, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with an upper bound on the wait
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Event, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Take every event that is already queued
    pub fn drain(&self) -> Vec<Event> {
        self.receiver.try_iter().collect()
    }

    /// Get an iterator over events
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.receiver.iter()
    }
}

/// Event bus for publish/subscribe pattern
pub struct EventBus {
    subscribers: RwLock<Vec<Sender<Event>>>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> EventSubscription {
        let (sender, receiver) = unbounded();
        self.subscribers.write().push(sender);
        EventSubscription { receiver }
    }

    /// Emit an event to all subscribers, dropping the ones that went away
    pub fn emit(&self, event: Event) -> usize {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|sender| sender.send(event.clone()).is_ok());

        trace!("Event {:?} delivered to {} subscribers", event, subscribers.len());
        subscribers.len()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus() {
        let bus = EventBus::new();
        let sub1 = bus.subscribe();
        let sub2 = bus.subscribe();

        assert_eq!(bus.subscriber_count(), 2);

        let delivered = bus.emit(Event::OutputCleared);
        assert_eq!(delivered, 2);

        assert_eq!(sub1.try_recv().unwrap(), Event::OutputCleared);
        assert_eq!(sub2.try_recv().unwrap(), Event::OutputCleared);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        assert_eq!(bus.emit(Event::BufferEdited { revision: 1 }), 1);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.drain(), vec![Event::BufferEdited { revision: 1 }]);
    }

    #[test]
    fn test_event_json() {
        let json = serde_json::to_value(Event::HighlightsApplied { revision: 4, keywords: 2 }).unwrap();
        assert_eq!(json["event"], "highlights_applied");
        assert_eq!(json["keywords"], 2);
    }
}
