use std::sync::{Arc, Mutex, PoisonError};

use serde_repr::{Deserialize_repr, Serialize_repr};

use super::Device;

/// Notification published by a [`Device`]
///
/// Events carry no payload: on `LocationUpdate`, for example, the sink
/// calls [`Device::get_location`] on the device it is handed. Discriminants
/// are stable and used when events are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u16)]
pub enum Event {
    /// The device was created and its transport configured
    Initialized = 0x0001,
    /// A line arrived while the link was considered disconnected
    Connected = 0x0002,
    /// The location reading was replaced
    LocationUpdate = 0x0003,
    /// The date/time reading was replaced
    DateTimeUpdate = 0x0004,
    /// Fix quality went from zero to non-zero
    FixAcquired = 0x0005,
    /// Fix quality went from non-zero to zero
    FixLost = 0x0006,
    /// No line arrived within the watchdog timeout
    TimedOut = 0x0007,
    /// The satellite reading was replaced
    SatelliteUpdate = 0x0008,
    /// A proprietary sentence arrived with no handler registered
    UnknownSentence = 0x0009,
}

/// Receives [`Event`]s from a [`Device`]
///
/// Called synchronously from inside the device, in the order the
/// triggering sentences were framed. Closures of the form
/// `|device: &Device, event: Event| { ... }` implement this trait; whatever
/// they capture takes the place of a user-data pointer.
pub trait EventSink: Send {
    fn on_event(&mut self, device: &Device, event: Event);
}

impl<F> EventSink for F
where
    F: FnMut(&Device, Event) + Send,
{
    fn on_event(&mut self, device: &Device, event: Event) {
        self(device, event)
    }
}

/// [`EventSink`] that appends every event to a shared list
///
/// Clones share the list: hand one clone to the device and
/// [`drain`](Self::drain) from another.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns all recorded events, oldest first
    pub fn drain(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Copies the recorded events without removing them
    pub fn snapshot(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times `event` has been recorded
    pub fn count(&self, event: Event) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| **e == event)
            .count()
    }
}

impl EventSink for EventRecorder {
    fn on_event(&mut self, _device: &Device, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
