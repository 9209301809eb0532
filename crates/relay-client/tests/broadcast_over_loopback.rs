//! End-to-end: the frame broadcast fans frames out to two real server
//! endpoints through `start_clients`.

use std::thread;
use std::time::{Duration, Instant};

use relay_client::application::frame_broadcast::{FrameBroadcast, DEFAULT_FRAME_NAME};
use relay_client::infrastructure::frame_source::FrameSource;
use relay_comm::{start_clients, CommSettings, Endpoint, EndpointOptions};
use relay_core::{Message, MessageKind};

fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

fn quick_options() -> EndpointOptions {
    EndpointOptions {
        settings: CommSettings {
            poll_timeout_ms: 20,
            ..CommSettings::default()
        },
        ..EndpointOptions::default()
    }
}

fn listening_server() -> (Endpoint, String) {
    let server = Endpoint::server("0", quick_options());
    server.connect().unwrap();
    assert!(wait_until(|| server.local_port().is_some()));
    let port = server.local_port().unwrap().to_string();
    (server, port)
}

fn drain(server: &Endpoint, count: usize) -> Vec<Message> {
    assert!(wait_until(|| server.received_len() >= count));
    std::iter::from_fn(|| server.next_received()).collect()
}

#[test]
fn test_each_server_gets_its_own_name() {
    // Arrange
    let (left, left_port) = listening_server();
    let (right, right_port) = listening_server();
    let ips = vec!["127.0.0.1".to_string(), "127.0.0.1".to_string()];
    let peers = start_clients(&ips, &[left_port, right_port], &quick_options());
    assert_eq!(peers.len(), 2);
    let mut source = FrameSource::gradient(64);
    let mut broadcast = FrameBroadcast::new(vec!["Noise_Gn 40".to_string()], true);

    // Act
    broadcast.start(&peers).unwrap();
    broadcast.broadcast(&peers, source.next_frame()).unwrap();

    // Assert
    let got_left = drain(&left, 3);
    let kinds: Vec<MessageKind> = got_left.iter().map(|m| m.kind).collect();
    assert_eq!(
        kinds,
        vec![MessageKind::StartTimer, MessageKind::Image, MessageKind::DisplayNow]
    );
    assert_eq!(got_left[1].name, "Noise_Gn 40");
    assert_eq!(got_left[1].payload.len(), 64);
    assert_eq!(got_left[2].name, "Noise_Gn 40");

    let got_right = drain(&right, 3);
    assert_eq!(got_right[1].name, DEFAULT_FRAME_NAME);
    assert_eq!(got_right[2].name, DEFAULT_FRAME_NAME);
}

#[test]
fn test_server_acks_are_collected_as_replies() {
    // Arrange
    let (server, port) = listening_server();
    let peers = start_clients(&["127.0.0.1".to_string()], &[port], &quick_options());
    assert_eq!(peers.len(), 1);
    let mut broadcast = FrameBroadcast::new(Vec::new(), false);
    broadcast.broadcast(&peers, &[1, 2, 3]).unwrap();
    drain(&server, 1);

    // Act
    server.send_ack(DEFAULT_FRAME_NAME).unwrap();
    assert!(wait_until(|| peers[0].received_len() == 1));
    let collected = broadcast.collect_replies(&peers);

    // Assert
    assert_eq!(collected, 1);
    assert_eq!(broadcast.replies(), 1);
}
