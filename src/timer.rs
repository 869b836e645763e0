//! Clock and scheduler collaborators
//!
//! The device never sleeps or spawns tasks. It reads a monotonic [`Clock`]
//! to timestamp readings, and asks a [`Scheduler`] to call
//! [`Device::on_timer`](crate::device::Device::on_timer) periodically while
//! the connection watchdog is armed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Monotonic time source
pub trait Clock: Send {
    /// Time elapsed since an arbitrary fixed origin; never decreases
    fn uptime(&self) -> Duration;
}

/// [`Clock`] backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn uptime(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven [`Clock`]
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the device.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward
    pub fn advance(&self, by: Duration) {
        self.micros
            .fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }

    /// Sets the absolute uptime; ignored if it would move time backwards
    pub fn set(&self, uptime: Duration) {
        self.micros
            .fetch_max(uptime.as_micros() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn uptime(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::SeqCst))
    }
}

/// Identifies one armed periodic timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Periodic timer service provided by the host
///
/// When a timer fires, the host must call
/// [`Device::on_timer`](crate::device::Device::on_timer) with its id.
/// Callbacks for a cancelled id are ignored by the device.
pub trait Scheduler: Send {
    fn schedule_repeating(&mut self, period: Duration) -> TimerId;
    fn cancel(&mut self, id: TimerId);
}

#[derive(Debug, Default)]
struct Slot {
    next_id: u64,
    armed: Option<(TimerId, Duration)>,
}

/// Single-slot [`Scheduler`] whose state is visible to the host
///
/// The device only ever arms one timer (the connection watchdog), so one
/// slot is enough. Drivers keep a clone and poll [`armed`](Self::armed) to
/// learn the current id and period.
#[derive(Debug, Clone, Default)]
pub struct SharedScheduler {
    slot: Arc<Mutex<Slot>>,
}

impl SharedScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently armed timer, if any
    pub fn armed(&self) -> Option<(TimerId, Duration)> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .armed
    }
}

impl Scheduler for SharedScheduler {
    fn schedule_repeating(&mut self, period: Duration) -> TimerId {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.next_id += 1;
        let id = TimerId(slot.next_id);
        slot.armed = Some((id, period));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(slot.armed, Some((armed, _)) if armed == id) {
            slot.armed = None;
        }
    }
}
