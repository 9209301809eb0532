//! Transport adapter: a client endpoint as a broadcast peer.

use relay_comm::{Endpoint, TransportError};

use crate::application::frame_broadcast::PeerLink;

impl PeerLink for Endpoint {
    fn push_image(&self, name: &str, data: Vec<u8>) -> Result<usize, TransportError> {
        self.send_image(name, data)
    }

    fn request_display(&self, name: &str) -> Result<usize, TransportError> {
        self.send_display_now(name)
    }

    fn reset_timer(&self) -> Result<usize, TransportError> {
        self.send_start_timer()
    }

    fn take_reply(&self) -> Option<String> {
        self.next_received().map(|message| message.name)
    }
}
