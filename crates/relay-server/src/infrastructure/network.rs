//! Transport adapter: the server endpoint as the frame-intake inbox.

use relay_comm::Endpoint;
use relay_core::Message;

use crate::application::frame_intake::Inbox;

impl Inbox for Endpoint {
    fn next_message(&self) -> Option<Message> {
        self.next_received()
    }
}
