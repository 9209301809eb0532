//! Receive-side decode progress, used only to pick log verbosity.
//!
//! ```text
//! Waiting ──bytes──► WaitingForHeader ──header complete──► Started ──more bytes──► Ongoing
//!    ▲                                                                              │
//!    └──────────────────────────── message decoded ─────────────────────────────────┘
//! ```
//!
//! Decoding never depends on this state; the receive worker logs the header
//! of a new message once, when the marker is `Started`.

use std::time::Instant;

use crate::protocol::messages::HEADER_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeProgress {
    #[default]
    Waiting,
    WaitingForHeader,
    Started,
    Ongoing,
}

/// Progress marker plus the instant the current message started arriving.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    state: DecodeProgress,
    began: Option<Instant>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DecodeProgress {
        self.state
    }

    /// Records that bytes were appended and the buffer now holds `buffered` bytes.
    pub fn on_bytes(&mut self, buffered: usize) {
        if self.state == DecodeProgress::Waiting {
            self.state = DecodeProgress::WaitingForHeader;
            self.began = Some(Instant::now());
        }
        if buffered >= HEADER_SIZE {
            self.state = match self.state {
                DecodeProgress::Waiting | DecodeProgress::WaitingForHeader => {
                    DecodeProgress::Started
                }
                DecodeProgress::Started | DecodeProgress::Ongoing => DecodeProgress::Ongoing,
            };
        }
    }

    /// Records a decoded message; returns how long it took to arrive.
    pub fn on_message(&mut self) -> Option<std::time::Duration> {
        self.state = DecodeProgress::Waiting;
        self.began.take().map(|began| began.elapsed())
    }

    /// True for the first chunk in which a full header is visible.
    pub fn is_new_header(&self) -> bool {
        self.state == DecodeProgress::Started
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_partial_chunk_moves_to_waiting_for_header() {
        let mut tracker = ProgressTracker::new();
        tracker.on_bytes(3);
        assert_eq!(tracker.state(), DecodeProgress::WaitingForHeader);
        assert!(!tracker.is_new_header());
    }

    #[test]
    fn test_header_visible_moves_to_started_then_ongoing() {
        // Arrange
        let mut tracker = ProgressTracker::new();

        // Act / Assert
        tracker.on_bytes(HEADER_SIZE);
        assert_eq!(tracker.state(), DecodeProgress::Started);
        assert!(tracker.is_new_header());

        tracker.on_bytes(HEADER_SIZE + 100);
        assert_eq!(tracker.state(), DecodeProgress::Ongoing);
        assert!(!tracker.is_new_header());
    }

    #[test]
    fn test_on_message_resets_to_waiting_and_reports_elapsed() {
        let mut tracker = ProgressTracker::new();
        tracker.on_bytes(HEADER_SIZE);
        let elapsed = tracker.on_message();
        assert!(elapsed.is_some());
        assert_eq!(tracker.state(), DecodeProgress::Waiting);
        assert_eq!(tracker.on_message(), None);
    }
}
