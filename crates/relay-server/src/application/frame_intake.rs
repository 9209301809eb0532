//! FrameIntakeUseCase: turns received messages into display work.
//!
//! Once per display tick the server drains everything the transport has
//! decoded since the last tick:
//!
//! | kind          | action                                                  |
//! |---------------|---------------------------------------------------------|
//! | `Image`       | apply control params, cache, queue in the display router |
//! | `DisplayNow`  | request display of the named image                      |
//! | `StartTimer`  | restart loop timing                                     |
//! | `Ack`         | count                                                   |
//! | `None`        | ignore                                                  |
//!
//! Only the newest `cache_capacity` images are kept; older ones are dropped
//! as new ones arrive.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;

use relay_core::{DisplayRouter, Message, MessageKind, TimingStats};
use tracing::{debug, info};

use crate::application::control_params::MixerParams;

/// Source of received messages, drained once per tick.
#[cfg_attr(test, mockall::automock)]
pub trait Inbox {
    fn next_message(&self) -> Option<Message>;
}

/// Running totals since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntakeCounters {
    pub images: u64,
    pub display_requests: u64,
    pub timer_resets: u64,
    pub acks: u64,
    pub ignored: u64,
}

pub struct FrameIntake {
    router: Arc<DisplayRouter>,
    cache: VecDeque<Message>,
    cache_capacity: usize,
    params: MixerParams,
    params_logged: bool,
    counters: IntakeCounters,
    loop_stats: TimingStats,
    frames_since_image: i32,
    began: Instant,
}

impl FrameIntake {
    pub fn new(router: Arc<DisplayRouter>, cache_capacity: usize) -> Self {
        Self {
            router,
            cache: VecDeque::with_capacity(cache_capacity + 1),
            cache_capacity: cache_capacity.max(1),
            params: MixerParams::default(),
            params_logged: false,
            counters: IntakeCounters::default(),
            loop_stats: TimingStats::new(),
            frames_since_image: 0,
            began: Instant::now(),
        }
    }

    /// Drains `inbox` and handles every message.  Returns how many were
    /// handled.
    pub fn poll(&mut self, inbox: &impl Inbox) -> usize {
        let mut handled = 0;
        while let Some(message) = inbox.next_message() {
            self.handle(message);
            handled += 1;
        }
        handled
    }

    pub fn handle(&mut self, message: Message) {
        match message.kind {
            MessageKind::Image => self.on_image(message),
            MessageKind::DisplayNow => {
                self.counters.display_requests += 1;
                self.router.image_should_be_displayed(message.name);
            }
            MessageKind::StartTimer => {
                self.counters.timer_resets += 1;
                self.loop_stats.reset();
                info!("start-timer received; loop timing restarted");
            }
            MessageKind::Ack => {
                self.counters.acks += 1;
                debug!("ack for '{}'", message.name);
            }
            MessageKind::None => self.counters.ignored += 1,
        }
    }

    fn on_image(&mut self, message: Message) {
        self.counters.images += 1;
        debug!("got image '{}' sz:{}", message.name, message.payload.len());

        self.params.apply(&message.name);
        if !self.params_logged {
            info!("mixer parameters: {}", self.params);
            self.params_logged = true;
        }
        self.frames_since_image = 0;

        self.cache.push_back(message.clone());
        while self.cache.len() > self.cache_capacity {
            if let Some(old) = self.cache.pop_front() {
                debug!("dropping cached image '{}'", old.name);
            }
        }
        self.router.queue_image_for_display(message);
    }

    /// Records one display tick at `now` and advances the cross-fade.
    pub fn tick(&mut self, now: Instant) -> f32 {
        self.loop_stats.increment_at(now);
        if self.frames_since_image < self.params.cycle_time {
            self.frames_since_image += 1;
        }
        self.params.fade_value(self.frames_since_image)
    }

    pub fn params(&self) -> &MixerParams {
        &self.params
    }

    pub fn counters(&self) -> IntakeCounters {
        self.counters
    }

    /// Cached images, oldest first.
    pub fn cached(&self) -> impl Iterator<Item = &Message> {
        self.cache.iter()
    }

    pub fn loop_stats(&self) -> &TimingStats {
        &self.loop_stats
    }

    /// Writes the periodic counter snapshot.
    ///
    /// # Errors
    ///
    /// Propagates any write error from `out`.
    pub fn write_snapshot(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "t:{}s", self.began.elapsed().as_secs_f64())?;
        writeln!(out, "images_rec'd: {}", self.counters.images)?;
        writeln!(out, "display_requests: {}", self.counters.display_requests)?;
        writeln!(out, "acks: {}", self.counters.acks)?;
        writeln!(out, "timer_resets: {}", self.counters.timer_resets)?;
        let cached: Vec<&str> = self.cache.iter().map(|m| m.name.as_str()).collect();
        writeln!(out, "cached: {}", cached.join(" | "))?;
        self.router.dump(out)?;
        self.loop_stats.dump(out, "loop")
    }
}

/// Name of the server's counter snapshot for `port`.
pub fn snapshot_file_name(port: &str) -> String {
    format!("server_counter_{port}.txt")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
