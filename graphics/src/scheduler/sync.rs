//! Thread synchronization primitives for the frame handshake.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Status of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    /// Nobody has set the event since the last wait consumed it.
    Unsignaled,
    /// The event is set and the next wait returns immediately.
    Signaled,
}

/// Auto-reset event.
///
/// [`set`](Event::set) wakes one waiter; a successful [`wait`](Event::wait)
/// consumes the signal and leaves the event unsignaled again. Setting an
/// already-set event has no further effect.
///
/// # Example
///
/// ```
/// use relay_graphics::scheduler::Event;
///
/// let event = Event::new(true);
/// event.wait(); // consumes the initial signal
/// assert!(!event.is_signaled());
/// ```
#[derive(Debug)]
pub struct Event {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl Event {
    /// Create an event in the given initial state.
    pub fn new(signaled: bool) -> Self {
        Self {
            signaled: Mutex::new(signaled),
            cond: Condvar::new(),
        }
    }

    /// Current status (non-blocking).
    pub fn status(&self) -> EventStatus {
        if *self.signaled.lock() {
            EventStatus::Signaled
        } else {
            EventStatus::Unsignaled
        }
    }

    /// Check if the event is set (non-blocking).
    pub fn is_signaled(&self) -> bool {
        self.status() == EventStatus::Signaled
    }

    /// Set the event and wake one waiter.
    pub fn set(&self) {
        let mut signaled = self.signaled.lock();
        *signaled = true;
        self.cond.notify_one();
    }

    /// Block until the event is set, then reset it.
    pub fn wait(&self) {
        let mut signaled = self.signaled.lock();
        while !*signaled {
            self.cond.wait(&mut signaled);
        }
        *signaled = false;
    }

    /// Wait with a timeout.
    ///
    /// Returns `true` if the event was set (and consumed), `false` if the
    /// timeout elapsed first.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut signaled = self.signaled.lock();
        if !*signaled {
            self.cond.wait_while_for(&mut signaled, |s| !*s, timeout);
        }
        std::mem::replace(&mut *signaled, false)
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_event_initial_state() {
        assert_eq!(Event::new(false).status(), EventStatus::Unsignaled);
        assert_eq!(Event::new(true).status(), EventStatus::Signaled);
    }

    #[test]
    fn test_wait_consumes_signal() {
        let event = Event::new(true);
        event.wait();
        assert!(!event.is_signaled());
        assert!(!event.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn test_set_is_not_counted() {
        let event = Event::new(false);
        event.set();
        event.set();
        event.wait();
        assert!(!event.is_signaled());
    }

    #[test]
    fn test_set_from_other_thread() {
        let event = Arc::new(Event::new(false));

        let signaler = event.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            signaler.set();
        });

        event.wait();
        assert!(!event.is_signaled());
    }

    #[test]
    fn test_wait_timeout() {
        let event = Event::new(false);
        assert!(!event.wait_timeout(Duration::from_millis(10)));

        event.set();
        assert!(event.wait_timeout(Duration::from_millis(10)));
    }
}
