//! FrameBroadcastUseCase: fans one captured frame out to every display server.
//!
//! For every tick the client sends, to each peer *i* in connection order:
//!
//! ```text
//! IMAGE(names[i], frame)          always
//! DISPLAY_NOW(names[i])           when send_display_now is set
//! ```
//!
//! A peer without an entry in `names` gets [`DEFAULT_FRAME_NAME`].  Image
//! names double as the server's control string, so a name such as
//! `"Noise_Gn 40 Fade_Tme 20"` retunes that server's mixer.

use relay_comm::TransportError;
use relay_core::TimingStats;
use thiserror::Error;
use tracing::{debug, info};

/// Name used for peers that have no configured name.
pub const DEFAULT_FRAME_NAME: &str = "frame";

/// Error type for broadcast operations.
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("peer {peer}: {source}")]
    Transport {
        peer: usize,
        #[source]
        source: TransportError,
    },
}

/// One connected display server, as seen by the use case.
#[cfg_attr(test, mockall::automock)]
pub trait PeerLink {
    /// Queues an image under `name`.
    fn push_image(&self, name: &str, data: Vec<u8>) -> Result<usize, TransportError>;

    /// Asks the peer to display the image it holds under `name`.
    fn request_display(&self, name: &str) -> Result<usize, TransportError>;

    /// Asks the peer to restart its timing statistics.
    fn reset_timer(&self) -> Result<usize, TransportError>;

    /// Returns the next message the peer sent back, by name, if any.
    fn take_reply(&self) -> Option<String>;
}

/// Per-tick fan-out of frames to a fixed peer list.
pub struct FrameBroadcast {
    names: Vec<String>,
    send_display_now: bool,
    frames_sent: u64,
    replies: u64,
    interval_stats: TimingStats,
}

impl FrameBroadcast {
    pub fn new(names: Vec<String>, send_display_now: bool) -> Self {
        Self {
            names,
            send_display_now,
            frames_sent: 0,
            replies: 0,
            interval_stats: TimingStats::new(),
        }
    }

    /// Name used for the peer at `index`.
    pub fn name_for(&self, index: usize) -> &str {
        self.names
            .get(index)
            .map_or(DEFAULT_FRAME_NAME, String::as_str)
    }

    /// Sends START_TIMER to every peer.
    ///
    /// # Errors
    ///
    /// Returns the first transport failure, tagged with the peer index.
    pub fn start<P: PeerLink>(&mut self, peers: &[P]) -> Result<(), BroadcastError> {
        for (peer, link) in peers.iter().enumerate() {
            link.reset_timer()
                .map_err(|source| BroadcastError::Transport { peer, source })?;
        }
        self.interval_stats.reset();
        info!("start-timer sent to {} peer(s)", peers.len());
        Ok(())
    }

    /// Sends `frame` to every peer.  Returns the number of messages queued.
    ///
    /// # Errors
    ///
    /// Returns the first transport failure, tagged with the peer index.
    /// Peers before the failing one have already been sent the frame.
    pub fn broadcast<P: PeerLink>(
        &mut self,
        peers: &[P],
        frame: &[u8],
    ) -> Result<usize, BroadcastError> {
        let mut queued = 0;
        for (peer, link) in peers.iter().enumerate() {
            let name = self.name_for(peer);
            link.push_image(name, frame.to_vec())
                .map_err(|source| BroadcastError::Transport { peer, source })?;
            queued += 1;
            if self.send_display_now {
                link.request_display(name)
                    .map_err(|source| BroadcastError::Transport { peer, source })?;
                queued += 1;
            }
        }
        self.frames_sent += 1;
        let interval = self.interval_stats.increment_now();
        debug!(
            "frame {} sent to {} peer(s), interval={interval:.4}s",
            self.frames_sent,
            peers.len()
        );
        Ok(queued)
    }

    /// Drains whatever the peers sent back.  Returns how many replies were
    /// collected.
    pub fn collect_replies<P: PeerLink>(&mut self, peers: &[P]) -> usize {
        let mut collected = 0;
        for link in peers {
            while let Some(name) = link.take_reply() {
                debug!("reply '{name}'");
                collected += 1;
            }
        }
        self.replies += collected as u64;
        collected
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn replies(&self) -> u64 {
        self.replies
    }

    /// Interval between consecutive broadcasts.
    pub fn interval_stats(&self) -> &TimingStats {
        &self.interval_stats
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::Sequence;

    #[test]
    fn test_broadcast_sends_image_then_display_request_per_peer() {
        // Arrange
        let mut seq = Sequence::new();
        let mut first = MockPeerLink::new();
        first
            .expect_push_image()
            .withf(|name, data| name == "left" && data == &[7u8, 7])
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(1));
        first
            .expect_request_display()
            .withf(|name| name == "left")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(1));
        let mut second = MockPeerLink::new();
        second
            .expect_push_image()
            .withf(|name, _| name == DEFAULT_FRAME_NAME)
            .times(1)
            .returning(|_, _| Ok(1));
        second
            .expect_request_display()
            .withf(|name| name == DEFAULT_FRAME_NAME)
            .times(1)
            .returning(|_| Ok(1));
        let mut broadcast = FrameBroadcast::new(vec!["left".to_string()], true);

        // Act
        let queued = broadcast.broadcast(&[first, second], &[7, 7]).unwrap();

        // Assert
        assert_eq!(queued, 4);
        assert_eq!(broadcast.frames_sent(), 1);
    }

    #[test]
    fn test_broadcast_without_display_now_sends_only_images() {
        let mut peer = MockPeerLink::new();
        peer.expect_push_image().times(1).returning(|_, _| Ok(1));
        peer.expect_request_display().never();
        let mut broadcast = FrameBroadcast::new(Vec::new(), false);

        let queued = broadcast.broadcast(&[peer], &[0]).unwrap();

        assert_eq!(queued, 1);
    }

    #[test]
    fn test_broadcast_reports_failing_peer_index() {
        // Arrange
        let mut ok = MockPeerLink::new();
        ok.expect_push_image().returning(|_, _| Ok(1));
        let mut broken = MockPeerLink::new();
        broken
            .expect_push_image()
            .returning(|_, _| Err(TransportError::NotConnected));
        let mut broadcast = FrameBroadcast::new(Vec::new(), false);

        // Act
        let result = broadcast.broadcast(&[ok, broken], &[1]);

        // Assert
        match result {
            Err(BroadcastError::Transport { peer, source }) => {
                assert_eq!(peer, 1);
                assert_eq!(source, TransportError::NotConnected);
            }
            other => panic!("expected transport error, got {other:?}"),
        }
        assert_eq!(broadcast.frames_sent(), 0);
    }

    #[test]
    fn test_start_resets_timer_on_every_peer() {
        let peers: Vec<MockPeerLink> = (0..3)
            .map(|_| {
                let mut peer = MockPeerLink::new();
                peer.expect_reset_timer().times(1).returning(|| Ok(1));
                peer
            })
            .collect();
        let mut broadcast = FrameBroadcast::new(Vec::new(), true);
        broadcast.start(&peers).unwrap();
    }

    #[test]
    fn test_collect_replies_drains_each_peer() {
        // Arrange
        let mut pending = vec!["b".to_string(), "a".to_string()];
        let mut peer = MockPeerLink::new();
        peer.expect_take_reply().returning(move || pending.pop());
        let mut broadcast = FrameBroadcast::new(Vec::new(), true);

        // Act
        let collected = broadcast.collect_replies(&[peer]);

        // Assert
        assert_eq!(collected, 2);
        assert_eq!(broadcast.replies(), 2);
    }

    #[test]
    fn test_name_for_falls_back_to_default() {
        let broadcast = FrameBroadcast::new(vec!["a".into(), "b".into()], true);
        assert_eq!(broadcast.name_for(0), "a");
        assert_eq!(broadcast.name_for(1), "b");
        assert_eq!(broadcast.name_for(2), DEFAULT_FRAME_NAME);
    }
}
