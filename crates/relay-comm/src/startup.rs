//! All-or-nothing startup of client fleets and single-server startup.

use std::thread;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::endpoint::{Endpoint, EndpointOptions};
use crate::error::ConnectResult;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: &str = "5569";

const RESULT_POLL: Duration = Duration::from_millis(1);

/// Connects one client endpoint per `(ip, port)` pair and waits until every
/// one of them has a terminal result.
///
/// Pairs are formed by position.  A count mismatch is only a warning: each
/// port is paired with the ip at the same position, or [`DEFAULT_HOST`] if
/// there is none, and surplus ips are ignored.  With no ports at all one
/// endpoint is opened to the first ip (or [`DEFAULT_HOST`]) on
/// [`DEFAULT_PORT`].
///
/// Returns an empty `Vec` if any endpoint failed; every endpoint of the
/// batch has then been disconnected.
pub fn start_clients(ips: &[String], ports: &[String], options: &EndpointOptions) -> Vec<Endpoint> {
    if ips.len() != ports.len() {
        warn!(
            "the count of ports ({}) does not match the number of ips ({})",
            ports.len(),
            ips.len()
        );
    }
    let targets: Vec<(&str, &str)> = if ports.is_empty() {
        let ip = ips.first().map_or(DEFAULT_HOST, String::as_str);
        vec![(ip, DEFAULT_PORT)]
    } else {
        ports
            .iter()
            .enumerate()
            .map(|(i, port)| (ips.get(i).map_or(DEFAULT_HOST, String::as_str), port.as_str()))
            .collect()
    };

    let endpoints: Vec<Endpoint> = targets
        .into_iter()
        .map(|(ip, port)| Endpoint::client(ip, port, options.clone()))
        .collect();
    for endpoint in &endpoints {
        // A fresh endpoint cannot already be started.
        let _ = endpoint.connect();
    }

    while endpoints
        .iter()
        .any(|endpoint| endpoint.connect_result() == ConnectResult::Pending)
    {
        thread::sleep(RESULT_POLL);
    }

    if let Some(failed) = endpoints
        .iter()
        .find(|endpoint| endpoint.connect_result() != ConnectResult::Success)
    {
        error!(
            "client {}:{} failed ({}); closing all {} connection(s)",
            failed.ip(),
            failed.port(),
            failed.connect_result(),
            endpoints.len()
        );
        for endpoint in &endpoints {
            endpoint.disconnect();
        }
        return Vec::new();
    }

    info!("{} client connection(s) established", endpoints.len());
    endpoints
}

/// Starts a server on `port` (default [`DEFAULT_PORT`]) and blocks until
/// the first peer is admitted or setup fails.
pub fn start_server(port: Option<&str>, options: &EndpointOptions) -> Option<Endpoint> {
    let endpoint = Endpoint::server(port.unwrap_or(DEFAULT_PORT), options.clone());
    let _ = endpoint.connect();
    while endpoint.connect_result() == ConnectResult::Pending {
        thread::sleep(RESULT_POLL);
    }
    if endpoint.connect_result() != ConnectResult::Success {
        return None;
    }
    Some(endpoint)
}
