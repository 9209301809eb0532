//! Streaming mean and standard deviation of inter-event timings.
//!
//! [`TimingStats`] uses Welford's online algorithm so the statistic is
//! updated in constant time and memory per sample.  The first `warm_up`
//! samples (default 300) only advance the count: the sample that reaches the
//! warm-up count seeds the mean, and every later sample updates the mean and
//! the sum of squared deviations.  Startup jitter (socket setup, first-frame
//! allocation) therefore never reaches the variance.
//!
//! Each post-warm-up sample appends the running standard deviation to a
//! history queue; [`TimingStats::dump`] writes the queue out and empties it.
//!
//! # Thread safety
//!
//! All state sits behind one `Mutex`, so a worker thread can call
//! `increment_*` while the owning thread calls `dump`.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Number of samples excluded from the variance by default.
pub const DEFAULT_WARM_UP: u64 = 300;

#[derive(Debug, Default)]
struct Inner {
    count: u64,
    last: Option<Instant>,
    mean: f64,
    sum_squares: f64,
    history: VecDeque<f64>,
}

/// Thread-safe Welford accumulator over durations, in seconds.
#[derive(Debug)]
pub struct TimingStats {
    warm_up: u64,
    inner: Mutex<Inner>,
}

impl TimingStats {
    pub fn new() -> Self {
        Self::with_warm_up(DEFAULT_WARM_UP)
    }

    /// Creates an accumulator with a custom warm-up.  A warm-up of 0 is
    /// treated as 1: the very first sample seeds the mean.
    pub fn with_warm_up(warm_up: u64) -> Self {
        Self {
            warm_up: warm_up.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn warm_up(&self) -> u64 {
        self.warm_up
    }

    /// Adds one duration sample and returns it in seconds.
    pub fn increment(&self, sample: Duration) -> f64 {
        let seconds = sample.as_secs_f64();
        let mut inner = self.lock();
        self.accumulate(&mut inner, seconds);
        seconds
    }

    /// Adds the interval between two instants.
    pub fn increment_between(&self, current: Instant, previous: Instant) -> f64 {
        self.increment(current.saturating_duration_since(previous))
    }

    /// Adds the interval since the previous `increment_at` call and makes
    /// `current` the new reference.  The first call only sets the reference
    /// and returns 0.
    pub fn increment_at(&self, current: Instant) -> f64 {
        let mut inner = self.lock();
        let Some(previous) = inner.last.replace(current) else {
            return 0.0;
        };
        let seconds = current.saturating_duration_since(previous).as_secs_f64();
        self.accumulate(&mut inner, seconds);
        seconds
    }

    /// [`increment_at`](Self::increment_at) with `Instant::now()`.
    pub fn increment_now(&self) -> f64 {
        self.increment_at(Instant::now())
    }

    /// Sets the reference instant for the next `increment_at` call.
    pub fn mark(&self, at: Instant) {
        self.lock().last = Some(at);
    }

    pub fn count(&self) -> u64 {
        self.lock().count
    }

    pub fn mean(&self) -> f64 {
        self.lock().mean
    }

    /// Current running standard deviation, or `None` during warm-up.
    pub fn std_dev(&self) -> Option<f64> {
        let inner = self.lock();
        if inner.count < self.warm_up {
            return None;
        }
        let n = (inner.count - self.warm_up + 1) as f64;
        Some((inner.sum_squares / n).sqrt())
    }

    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    /// Discards every sample and the reference instant.
    pub fn reset(&self) {
        *self.lock() = Inner::default();
    }

    /// Writes count, mean, and the standard-deviation history, then drains
    /// the history.
    ///
    /// ```text
    /// DISPLAY_NOW: 930 - 300
    /// mean: 0.0333
    /// sd:   0.0012 0.0011 ...
    /// ```
    ///
    /// # Errors
    ///
    /// Propagates any write error from `out`.  The history is drained even
    /// if writing fails part-way.
    pub fn dump(&self, out: &mut impl Write, label: &str) -> io::Result<()> {
        let mut inner = self.lock();
        writeln!(out, "{label}: {} - {}", inner.count, self.warm_up)?;
        writeln!(out, "mean: {}", inner.mean)?;
        write!(out, "sd:   ")?;
        let history: Vec<f64> = inner.history.drain(..).collect();
        drop(inner);
        for sd in history {
            write!(out, "{sd} ")?;
        }
        writeln!(out)
    }

    fn accumulate(&self, inner: &mut Inner, seconds: f64) {
        inner.count += 1;
        if inner.count == self.warm_up {
            inner.mean = seconds;
            inner.sum_squares = 0.0;
        } else if inner.count > self.warm_up {
            let n = (inner.count - self.warm_up + 1) as f64;
            let d1 = seconds - inner.mean;
            let new_mean = inner.mean + d1 / n;
            let d2 = seconds - new_mean;
            let new_sum_squares = inner.sum_squares + d1 * d2;
            inner.history.push_back((new_sum_squares / n).sqrt());
            inner.mean = new_mean;
            inner.sum_squares = new_sum_squares;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves plain numbers behind; keep going.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TimingStats {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_samples_before_warm_up_do_not_touch_mean_or_history() {
        // Arrange
        let stats = TimingStats::with_warm_up(3);

        // Act
        stats.increment(ms(500));
        stats.increment(ms(900));

        // Assert
        assert_eq!(stats.count(), 2);
        assert_eq!(stats.mean(), 0.0);
        assert_eq!(stats.std_dev(), None);
        assert_eq!(stats.history_len(), 0);
    }

    #[test]
    fn test_welford_matches_direct_computation_after_warm_up() {
        // Arrange – two warm-up outliers, then 1, 2, 3 ms
        let stats = TimingStats::with_warm_up(3);
        for sample in [ms(500), ms(900), ms(1), ms(2), ms(3)] {
            stats.increment(sample);
        }

        // Assert – mean of {1,2,3} ms, population deviation sqrt(2/3) ms
        assert!((stats.mean() - 0.002).abs() < 1e-12);
        let expected_sd = (2.0f64 / 3.0).sqrt() / 1000.0;
        assert!((stats.std_dev().unwrap() - expected_sd).abs() < 1e-12);
        assert_eq!(stats.history_len(), 2);
    }

    #[test]
    fn test_warm_up_zero_is_treated_as_one() {
        let stats = TimingStats::with_warm_up(0);
        stats.increment(ms(10));
        assert_eq!(stats.warm_up(), 1);
        assert!((stats.mean() - 0.010).abs() < 1e-12);
        assert_eq!(stats.std_dev(), Some(0.0));
    }

    #[test]
    fn test_increment_at_first_call_only_sets_reference() {
        // Arrange
        let stats = TimingStats::with_warm_up(1);
        let t0 = Instant::now();

        // Act
        let first = stats.increment_at(t0);
        let second = stats.increment_at(t0 + ms(40));

        // Assert
        assert_eq!(first, 0.0);
        assert!((second - 0.040).abs() < 1e-9);
        assert_eq!(stats.count(), 1);
    }

    #[test]
    fn test_increment_between_uses_given_instants() {
        let stats = TimingStats::new();
        let t0 = Instant::now();
        let seconds = stats.increment_between(t0 + ms(25), t0);
        assert!((seconds - 0.025).abs() < 1e-9);
    }

    #[test]
    fn test_dump_writes_format_and_drains_history() {
        // Arrange
        let stats = TimingStats::with_warm_up(1);
        stats.increment(ms(1));
        stats.increment(ms(3));
        let mut out = Vec::new();

        // Act
        stats.dump(&mut out, "loop").unwrap();

        // Assert
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "loop: 2 - 1");
        let mean: f64 = lines[1].trim_start_matches("mean: ").parse().unwrap();
        assert!((mean - 0.002).abs() < 1e-12);
        let sds: Vec<f64> = lines[2]
            .trim_start_matches("sd:")
            .split_whitespace()
            .map(|v| v.parse().unwrap())
            .collect();
        assert_eq!(sds.len(), 1);
        assert!((sds[0] - 0.001).abs() < 1e-12);
        assert_eq!(stats.history_len(), 0, "dump must drain the history");
    }

    #[test]
    fn test_reset_clears_everything() {
        let stats = TimingStats::with_warm_up(1);
        stats.increment(ms(5));
        stats.increment(ms(6));
        stats.reset();
        assert_eq!(stats.count(), 0);
        assert_eq!(stats.history_len(), 0);
        assert_eq!(stats.increment_now(), 0.0);
    }

    #[test]
    fn test_concurrent_increments_are_all_counted() {
        // Arrange
        let stats = Arc::new(TimingStats::with_warm_up(10));

        // Act
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let s = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..250 {
                        s.increment(ms(1));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread panicked");
        }

        // Assert
        assert_eq!(stats.count(), 1000);
        assert_eq!(stats.history_len(), 990);
    }
}
