//! Broadcast wake-up signal for threads waiting on received messages.
//!
//! A notification wakes every thread currently blocked in [`Waiter::wait`]
//! or [`Waiter::wait_timeout`].  Notifications are not queued: one sent
//! while nobody waits is lost.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct Waiter {
    generation: Mutex<u64>,
    signal: Condvar,
}

impl Waiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the next [`notify`](Self::notify).
    pub fn wait(&self) {
        let mut generation = self.lock();
        let start = *generation;
        while *generation == start {
            generation = self
                .signal
                .wait(generation)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Blocks until the next notification or until `timeout` elapses.
    /// Returns `true` if woken by a notification.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut generation = self.lock();
        let start = *generation;
        while *generation == start {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            generation = match self.signal.wait_timeout(generation, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }

    /// Wakes every waiting thread.
    pub fn notify(&self) {
        let mut generation = self.lock();
        *generation = generation.wrapping_add(1);
        self.signal.notify_all();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, u64> {
        self.generation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
