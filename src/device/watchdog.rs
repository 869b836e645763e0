//! Fix and connection state machines

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use super::Event;
use crate::timer::{Scheduler, TimerId};

/// Whether the receiver currently reports a usable position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum FixState {
    #[default]
    NoFix = 0,
    Fix = 1,
}

impl FixState {
    /// Derives the state from a GGA fix-quality code
    pub fn from_quality(fix_quality: u8) -> Self {
        if fix_quality > 0 {
            FixState::Fix
        } else {
            FixState::NoFix
        }
    }
}

/// Edge event for a change in fix quality, if the change crosses zero
pub fn fix_transition(previous: u8, current: u8) -> Option<Event> {
    match (FixState::from_quality(previous), FixState::from_quality(current)) {
        (FixState::Fix, FixState::NoFix) => Some(Event::FixLost),
        (FixState::NoFix, FixState::Fix) => Some(Event::FixAcquired),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// Idle-timeout detector for the receive link
///
/// Every framed line marks the link as seen. While armed, a periodic timer
/// checks how long the link has been silent and declares it disconnected
/// once the silence exceeds the timeout.
#[derive(Debug, Default)]
pub struct ConnectionWatchdog {
    state: ConnectionState,
    last_seen: Option<Duration>,
    timeout: Option<Duration>,
    timer: Option<TimerId>,
}

impl ConnectionWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The armed timeout, `None` while disabled
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn timer(&self) -> Option<TimerId> {
        self.timer
    }

    /// Records a framed line; returns true on the Disconnected → Connected edge
    pub fn line_received(&mut self, now: Duration) -> bool {
        self.last_seen = Some(now);
        if self.state == ConnectionState::Disconnected {
            self.state = ConnectionState::Connected;
            true
        } else {
            false
        }
    }

    /// Re-arms the watchdog; a zero timeout disables it
    ///
    /// Any previous timer is cancelled first. Enabling treats `now` as the
    /// last time the link was seen so the first check cannot fire early.
    pub fn set_timeout(&mut self, timeout: Duration, now: Duration, scheduler: &mut dyn Scheduler) {
        self.cancel(scheduler);
        if timeout.is_zero() {
            return;
        }
        self.timeout = Some(timeout);
        self.last_seen = Some(now);
        self.timer = Some(scheduler.schedule_repeating(timeout));
    }

    /// Cancels the pending timer, if any, and disables the watchdog
    pub fn cancel(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(id) = self.timer.take() {
            scheduler.cancel(id);
        }
        self.timeout = None;
    }

    /// Timer callback; returns true on the Connected → Disconnected edge
    ///
    /// Ticks from a cancelled or replaced timer are ignored.
    pub fn on_timer(&mut self, id: TimerId, now: Duration) -> bool {
        if self.timer != Some(id) {
            return false;
        }
        let (Some(timeout), Some(last_seen)) = (self.timeout, self.last_seen) else {
            return false;
        };
        if self.state == ConnectionState::Connected && now.saturating_sub(last_seen) > timeout {
            self.state = ConnectionState::Disconnected;
            true
        } else {
            false
        }
    }

    /// Forces the Disconnected state without an event
    ///
    /// The next framed line reports Connected again.
    pub fn reset(&mut self) {
        self.state = ConnectionState::Disconnected;
    }
}
