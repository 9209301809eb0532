//! Keyed pending-image store plus ordered display-request queue.
//!
//! ```text
//! queue_image_for_display(msg) ──► pending: name → Message   (latest wins)
//! image_should_be_displayed(name) ──► requests: [name, name, ...]
//!
//! drain worker:  pop name ─► pending.remove(name) ─► render(msg)
//!                                     └─ missing ─► not_found += 1, drop request
//! ```
//!
//! The drain worker never waits for a missing image; a request for a name
//! that is not pending is counted and discarded.

use std::collections::{HashMap, VecDeque};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::protocol::messages::Message;
use crate::stats::TimingStats;

/// Render callback.  Receives ownership of the message being displayed.
pub type DisplayFunction = Box<dyn FnMut(Message) + Send>;

/// Sleep between drain attempts when no request is queued.
const IDLE_SLEEP: Duration = Duration::from_micros(100);

/// Result of one drain step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The named image was handed to the render callback.
    Displayed(String),
    /// A request was dequeued but no image with that name was pending.
    NotFound(String),
    /// No request was queued.
    Idle,
}

/// Snapshot of the router's lifetime counters and current queue depths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterCounters {
    pub displayed: u64,
    pub all_display_q: u64,
    pub all_pending_q: u64,
    pub still_pending: usize,
    pub still_display: usize,
    pub not_found: u64,
}

#[derive(Default)]
struct Queues {
    pending: HashMap<String, Message>,
    requests: VecDeque<String>,
    display_q_count: u64,
    pending_q_count: u64,
    display_count: u64,
    not_found_count: u64,
}

struct Shared {
    queues: Mutex<Queues>,
    display: Mutex<Option<DisplayFunction>>,
    running: AtomicBool,
    frame_stats: TimingStats,
}

/// Pending-image store drained into an external render callback.
pub struct DisplayRouter {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DisplayRouter {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                queues: Mutex::new(Queues::default()),
                display: Mutex::new(None),
                running: AtomicBool::new(false),
                frame_stats: TimingStats::new(),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Stores `message` under its name, replacing any image already pending
    /// under the same name.
    pub fn queue_image_for_display(&self, message: Message) {
        let mut queues = lock(&self.shared.queues);
        queues.pending_q_count += 1;
        if let Some(replaced) = queues.pending.insert(message.name.clone(), message) {
            debug!("replaced pending image '{}'", replaced.name);
        }
    }

    /// Appends a display request for `name`.
    pub fn image_should_be_displayed(&self, name: impl Into<String>) {
        let mut queues = lock(&self.shared.queues);
        queues.requests.push_back(name.into());
        queues.display_q_count += 1;
    }

    /// Installs the render callback.  Images drained while no callback is
    /// installed are counted as displayed and dropped.
    pub fn set_display_function(&self, display: impl FnMut(Message) + Send + 'static) {
        *lock(&self.shared.display) = Some(Box::new(display));
    }

    /// Serves at most one display request.
    pub fn drain_once(&self) -> DrainOutcome {
        self.shared.drain_once()
    }

    /// Spawns the drain worker.  Returns `Ok(false)` if it is already running.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn start(&self) -> io::Result<bool> {
        let mut worker = lock(&self.worker);
        if worker.is_some() {
            return Ok(false);
        }
        self.shared.running.store(true, Ordering::SeqCst);
        self.shared.frame_stats.mark(Instant::now());

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("relay-display".to_string())
            .spawn(move || shared.drain_loop())
            .map_err(|e| {
                self.shared.running.store(false, Ordering::SeqCst);
                e
            })?;
        *worker = Some(handle);
        Ok(true)
    }

    /// Stops the drain worker and waits for it to exit.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = lock(&self.worker).take() {
            if handle.join().is_err() {
                warn!("display thread panicked");
            }
        }
    }

    pub fn counters(&self) -> RouterCounters {
        let queues = lock(&self.shared.queues);
        RouterCounters {
            displayed: queues.display_count,
            all_display_q: queues.display_q_count,
            all_pending_q: queues.pending_q_count,
            still_pending: queues.pending.len(),
            still_display: queues.requests.len(),
            not_found: queues.not_found_count,
        }
    }

    /// Interval between consecutive displayed frames.
    pub fn frame_stats(&self) -> &TimingStats {
        &self.shared.frame_stats
    }

    /// Writes the counters, one `key: value` per line.
    ///
    /// # Errors
    ///
    /// Propagates any write error from `out`.
    pub fn dump(&self, out: &mut impl Write) -> io::Result<()> {
        let c = self.counters();
        writeln!(out, "displayed: {}", c.displayed)?;
        writeln!(out, "all_display_q: {}", c.all_display_q)?;
        writeln!(out, "all_pending_q: {}", c.all_pending_q)?;
        writeln!(out, "still_pending: {}", c.still_pending)?;
        writeln!(out, "still_display: {}", c.still_display)?;
        writeln!(out, "not_found: {}", c.not_found)
    }
}

impl Default for DisplayRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DisplayRouter {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    fn drain_loop(&self) {
        info!("display thread started");
        while self.running.load(Ordering::SeqCst) {
            if self.drain_once() == DrainOutcome::Idle {
                thread::sleep(IDLE_SLEEP);
            }
        }
        info!("display thread stopped");
    }

    fn drain_once(&self) -> DrainOutcome {
        let (name, image) = {
            let mut queues = lock(&self.queues);
            let Some(name) = queues.requests.pop_front() else {
                return DrainOutcome::Idle;
            };
            match queues.pending.remove(&name) {
                Some(image) => {
                    queues.display_count += 1;
                    (name, image)
                }
                None => {
                    queues.not_found_count += 1;
                    info!("'{name}' not in pending queue");
                    return DrainOutcome::NotFound(name);
                }
            }
        };

        let begin = Instant::now();
        if let Some(display) = lock(&self.display).as_mut() {
            display(image);
        }
        let current = Instant::now();
        let one_frame = self.frame_stats.increment_at(current);
        debug!(
            "displayed '{name}' elapsed={:?} frame_interval={one_frame:.4}s",
            current - begin
        );
        DrainOutcome::Displayed(name)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn recording_router() -> (DisplayRouter, mpsc::Receiver<Message>) {
        let router = DisplayRouter::new();
        let (tx, rx) = mpsc::channel();
        router.set_display_function(move |msg| {
            let _ = tx.send(msg);
        });
        (router, rx)
    }

    #[test]
    fn test_drain_once_idle_when_no_requests() {
        let router = DisplayRouter::new();
        assert_eq!(router.drain_once(), DrainOutcome::Idle);
    }

    #[test]
    fn test_requested_image_is_rendered_and_removed() {
        // Arrange
        let (router, rx) = recording_router();
        router.queue_image_for_display(Message::image("a", vec![1, 2, 3]));
        router.image_should_be_displayed("a");

        // Act
        let outcome = router.drain_once();

        // Assert
        assert_eq!(outcome, DrainOutcome::Displayed("a".to_string()));
        assert_eq!(rx.try_recv().unwrap().payload, vec![1, 2, 3]);
        let c = router.counters();
        assert_eq!(c.displayed, 1);
        assert_eq!(c.still_pending, 0);
    }

    #[test]
    fn test_missing_name_is_dropped_and_counted() {
        // Arrange
        let (router, rx) = recording_router();
        router.image_should_be_displayed("ghost");
        router.queue_image_for_display(Message::image("real", vec![9]));
        router.image_should_be_displayed("real");

        // Act
        let first = router.drain_once();
        let second = router.drain_once();

        // Assert – the absent name never blocks the following request
        assert_eq!(first, DrainOutcome::NotFound("ghost".to_string()));
        assert_eq!(second, DrainOutcome::Displayed("real".to_string()));
        assert_eq!(rx.try_recv().unwrap().name, "real");
        assert_eq!(router.counters().not_found, 1);
    }

    #[test]
    fn test_queue_image_overwrites_same_name() {
        // Arrange
        let (router, rx) = recording_router();
        router.queue_image_for_display(Message::image("a", vec![1]));
        router.queue_image_for_display(Message::image("a", vec![2]));
        router.image_should_be_displayed("a");

        // Act
        router.drain_once();

        // Assert
        assert_eq!(rx.try_recv().unwrap().payload, vec![2]);
        let c = router.counters();
        assert_eq!(c.all_pending_q, 2);
        assert_eq!(c.still_pending, 0);
    }

    #[test]
    fn test_requests_are_served_in_fifo_order() {
        let (router, rx) = recording_router();
        for name in ["x", "y", "z"] {
            router.queue_image_for_display(Message::image(name, vec![]));
        }
        for name in ["z", "x", "y"] {
            router.image_should_be_displayed(name);
        }
        while router.drain_once() != DrainOutcome::Idle {}

        let order: Vec<String> = rx.try_iter().map(|m| m.name).collect();
        assert_eq!(order, vec!["z", "x", "y"]);
    }

    #[test]
    fn test_worker_drains_requests_until_stopped() {
        // Arrange
        let (router, rx) = recording_router();
        assert!(router.start().unwrap());
        assert!(!router.start().unwrap(), "second start must be refused");

        // Act
        router.queue_image_for_display(Message::image("live", vec![7]));
        router.image_should_be_displayed("live");
        let received = rx.recv_timeout(Duration::from_secs(2));
        router.stop();

        // Assert
        assert_eq!(received.unwrap().name, "live");
        assert_eq!(router.counters().displayed, 1);
    }

    #[test]
    fn test_dump_lists_all_counters() {
        let router = DisplayRouter::new();
        router.image_should_be_displayed("nope");
        router.drain_once();
        let mut out = Vec::new();
        router.dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("displayed: 0"));
        assert!(text.contains("all_display_q: 1"));
        assert!(text.contains("not_found: 1"));
        assert!(text.contains("still_display: 0"));
    }
}
