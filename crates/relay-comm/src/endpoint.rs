//! The transport endpoint: one role, its connections, and its inbox.
//!
//! # Client role
//!
//! [`Endpoint::connect`] spawns a setup thread that resolves the host, tries
//! each resolved address in turn, and on the first successful connect starts
//! a send/receive worker pair on that connection and reports `Success`.
//!
//! # Server role
//!
//! The setup thread binds the port, switches the listener to non-blocking,
//! and becomes the accept loop.  Each candidate is offered to the
//! [`AdmissionPolicy`]; admitted peers get a registry slot and a worker
//! pair.  `Success` is reported at the first admitted peer, not at bind.
//!
//! # Shared state
//!
//! ```text
//! Endpoint ── Arc<Shared> ──┬── result            (Pending → terminal, once)
//!                           ├── inbox             (decoded messages, FIFO)
//!                           ├── remotes           (slot registry, server only)
//!                           ├── retired           (lost remotes awaiting join)
//!                           └── local             (client's own connection)
//! ```
//!
//! Worker threads hold `Arc<Shared>` and `Arc<Connection>`; a connection
//! never points back at the endpoint, so dropping the endpoint after
//! [`Endpoint::disconnect`] frees everything once the workers have exited.

use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::thread::{self, JoinHandle};

use relay_core::{payload_len_field, Message, MessageKind, TimingStats};
use tracing::{debug, error, info, warn};

use crate::admission::{AdmissionPolicy, SinglePeer};
use crate::connection::Connection;
use crate::diagnostics;
use crate::error::{CommError, ConnectResult, TransportError};
use crate::pipeline::{is_timeout_error, spawn_workers};
use crate::registry::{ConnectionHandle, ConnectionRegistry};
use crate::settings::CommSettings;
use crate::waiter::Waiter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Client,
    Server,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Server => "server",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How [`Endpoint::send`] hands a message to its connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendMode {
    /// Write on the calling thread before returning.
    Blocking,
    /// Queue for each connection's send worker and return immediately.
    #[default]
    NonBlocking,
}

/// Construction-time options for an [`Endpoint`].
#[derive(Clone)]
pub struct EndpointOptions {
    pub settings: CommSettings,
    /// Consulted by the server accept loop; ignored by clients.
    pub policy: Arc<dyn AdmissionPolicy>,
    /// Notified after every decoded message.
    pub waiter: Option<Arc<Waiter>>,
}

impl Default for EndpointOptions {
    fn default() -> Self {
        Self {
            settings: CommSettings::default(),
            policy: Arc::new(SinglePeer),
            waiter: None,
        }
    }
}

impl fmt::Debug for EndpointOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointOptions")
            .field("settings", &self.settings)
            .field("waiter", &self.waiter.is_some())
            .finish_non_exhaustive()
    }
}

// ── Shared state ──────────────────────────────────────────────────────────────

pub(crate) struct Shared {
    role: Role,
    ip: String,
    port: String,
    settings: CommSettings,
    policy: Arc<dyn AdmissionPolicy>,
    running: AtomicBool,
    bound_port: OnceLock<u16>,
    result: Mutex<ConnectResult>,
    inbox: Mutex<VecDeque<Message>>,
    remotes: Mutex<ConnectionRegistry<Arc<Connection>>>,
    retired: Mutex<Vec<Arc<Connection>>>,
    local: Mutex<Option<Arc<Connection>>>,
    waiter: Mutex<Option<Arc<Waiter>>>,
    receive_stats: TimingStats,
    display_now_count: AtomicU64,
    last_error: Mutex<Option<TransportError>>,
}

impl Shared {
    pub(crate) fn settings(&self) -> &CommSettings {
        &self.settings
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Moves the result out of `Pending`; later calls are ignored.
    fn set_result(&self, result: ConnectResult) -> bool {
        let mut current = lock(&self.result);
        if current.is_terminal() {
            return false;
        }
        *current = result;
        match result {
            ConnectResult::Success => info!("{} {}:{} connected", self.role, self.ip, self.port),
            failure => error!("{} {}:{} failed: {failure}", self.role, self.ip, self.port),
        }
        true
    }

    /// Handles the first fatal error of `conn`.  Server connections leave
    /// the registry and are parked until a thread that is not one of their
    /// workers can join them.
    pub(crate) fn connection_lost(
        &self,
        conn: &Arc<Connection>,
        slot: Option<ConnectionHandle>,
        error: TransportError,
    ) {
        if !conn.fail(error.clone()) {
            return;
        }
        match &error {
            TransportError::PeerDisconnected => info!("{} disconnected", conn.peer()),
            other => error!("connection to {} failed: {other}", conn.peer()),
        }
        *lock(&self.last_error) = Some(error);

        if let Some(slot) = slot {
            let mut remotes = lock(&self.remotes);
            if let Some(removed) = remotes.remove(slot) {
                lock(&self.retired).push(removed);
            }
        }
    }

    pub(crate) fn deliver(&self, message: Message) {
        if message.kind == MessageKind::DisplayNow {
            self.record_display_now();
        }
        lock(&self.inbox).push_back(message);
        let waiter = lock(&self.waiter).clone();
        if let Some(waiter) = waiter {
            waiter.notify();
        }
    }

    fn record_display_now(&self) {
        let interval = self.receive_stats.increment_now();
        let count = self.display_now_count.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("display-now #{count}, {interval:.4}s since previous");

        let every = self.settings.stats_dump_every;
        if every == 0 || count % every != 0 {
            return;
        }
        if let Some(dir) = &self.settings.diagnostics_dir {
            let path = dir.join(diagnostics::receive_snapshot_name(self.role, &self.port));
            if let Err(e) =
                diagnostics::write_snapshot(&path, |out| self.receive_stats.dump(out, "DISPLAY_NOW"))
            {
                warn!("{e}");
            }
        }
    }

    fn reap_retired(&self) {
        let retired = std::mem::take(&mut *lock(&self.retired));
        for conn in retired {
            conn.stop();
            debug!("reaped connection to {}", conn.peer());
        }
    }

    // ── Client setup ─────────────────────────────────────────────────────────

    fn run_client(self: &Arc<Self>) {
        let candidates = match self.resolve() {
            Ok(addrs) if !addrs.is_empty() => addrs,
            Ok(_) => {
                self.set_result(ConnectResult::AddrInfoError);
                return;
            }
            Err(e) => {
                warn!("cannot resolve {}:{}: {e}", self.ip, self.port);
                self.set_result(ConnectResult::AddrInfoError);
                return;
            }
        };

        let mut connected = None;
        for addr in candidates {
            if !self.running() {
                break;
            }
            info!("client: connecting to {addr}");
            match TcpStream::connect_timeout(&addr, self.settings.connect_timeout()) {
                Ok(stream) => {
                    connected = Some(stream);
                    break;
                }
                Err(e) => warn!("connection attempt to {addr} failed: {e}"),
            }
        }
        let Some(stream) = connected else {
            self.set_result(ConnectResult::FailedToConnect);
            return;
        };

        let conn = match Connection::new(stream, &self.settings) {
            Ok(conn) => Arc::new(conn),
            Err(e) => {
                warn!("cannot configure socket: {e}");
                self.set_result(ConnectResult::CreateSocketFailure);
                return;
            }
        };
        *lock(&self.local) = Some(Arc::clone(&conn));
        if let Err(e) = spawn_workers(self, &conn, None) {
            warn!("cannot start workers: {e}");
            conn.stop();
            lock(&self.local).take();
            self.set_result(ConnectResult::CreateSocketFailure);
            return;
        }
        self.set_result(ConnectResult::Success);
    }

    fn resolve(&self) -> io::Result<Vec<SocketAddr>> {
        let port: u16 = self
            .port
            .parse()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid port"))?;
        Ok((self.ip.as_str(), port).to_socket_addrs()?.collect())
    }

    // ── Server setup ─────────────────────────────────────────────────────────

    fn run_server(self: &Arc<Self>) {
        let Ok(port) = self.port.parse::<u16>() else {
            warn!("invalid port '{}'", self.port);
            self.set_result(ConnectResult::AddrInfoError);
            return;
        };
        let listener = match TcpListener::bind(("0.0.0.0", port)) {
            Ok(listener) => listener,
            Err(e) => {
                warn!("bind to port {port} failed: {e}");
                self.set_result(match e.kind() {
                    io::ErrorKind::AddrInUse
                    | io::ErrorKind::AddrNotAvailable
                    | io::ErrorKind::PermissionDenied => ConnectResult::FailedToBind,
                    _ => ConnectResult::ListenFailure,
                });
                return;
            }
        };
        if let Err(e) = listener.set_nonblocking(true) {
            warn!("cannot make listener non-blocking: {e}");
            self.set_result(ConnectResult::BlockingFailure);
            return;
        }
        if let Ok(addr) = listener.local_addr() {
            let _ = self.bound_port.set(addr.port());
            info!("server listening at {addr}");
        }

        self.accept_loop(&listener);
    }

    fn accept_loop(self: &Arc<Self>, listener: &TcpListener) {
        while self.running() {
            self.reap_retired();
            match listener.accept() {
                Ok((stream, peer)) => self.admit(stream, peer),
                Err(e) if is_timeout_error(&e) => thread::sleep(self.settings.accept_interval()),
                Err(e) => {
                    warn!("accept failed: {e}");
                    thread::sleep(self.settings.accept_interval());
                }
            }
        }
        self.reap_retired();
        info!("accept loop on port {} stopped", self.port);
    }

    fn admit(self: &Arc<Self>, stream: TcpStream, peer: SocketAddr) {
        info!("server: got new connection from {peer}");
        let active = lock(&self.remotes).len();
        if !self.policy.allow(peer, active) {
            info!("rejecting {peer}: {active} connection(s) already active");
            let _ = stream.shutdown(Shutdown::Both);
            return;
        }
        if let Err(e) = stream.set_nonblocking(false) {
            warn!("cannot make {peer} blocking: {e}");
            return;
        }
        let conn = match Connection::new(stream, &self.settings) {
            Ok(conn) => Arc::new(conn),
            Err(e) => {
                warn!("cannot configure socket for {peer}: {e}");
                return;
            }
        };

        let slot = lock(&self.remotes).insert(Arc::clone(&conn));
        if let Err(e) = spawn_workers(self, &conn, Some(slot)) {
            warn!("cannot start workers for {peer}: {e}");
            lock(&self.remotes).remove(slot);
            conn.stop();
            return;
        }
        self.set_result(ConnectResult::Success);
        self.policy.on_admitted(peer);
    }
}

// ── Endpoint ──────────────────────────────────────────────────────────────────

/// One client or server role instance.
pub struct Endpoint {
    shared: Arc<Shared>,
    started: AtomicBool,
    setup: Mutex<Option<JoinHandle<()>>>,
}

impl Endpoint {
    /// An endpoint that will connect to `ip:port`.
    pub fn client(ip: impl Into<String>, port: impl Into<String>, options: EndpointOptions) -> Self {
        Self::new(Role::Client, ip.into(), port.into(), options)
    }

    /// An endpoint that will listen on `port` on every interface.  Port
    /// `"0"` picks a free port; see [`local_port`](Self::local_port).
    pub fn server(port: impl Into<String>, options: EndpointOptions) -> Self {
        Self::new(Role::Server, String::new(), port.into(), options)
    }

    fn new(role: Role, ip: String, port: String, options: EndpointOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                role,
                ip,
                port,
                settings: options.settings,
                policy: options.policy,
                running: AtomicBool::new(false),
                bound_port: OnceLock::new(),
                result: Mutex::new(ConnectResult::Pending),
                inbox: Mutex::new(VecDeque::new()),
                remotes: Mutex::new(ConnectionRegistry::new()),
                retired: Mutex::new(Vec::new()),
                local: Mutex::new(None),
                waiter: Mutex::new(options.waiter),
                receive_stats: TimingStats::new(),
                display_now_count: AtomicU64::new(0),
                last_error: Mutex::new(None),
            }),
            started: AtomicBool::new(false),
            setup: Mutex::new(None),
        }
    }

    /// Starts connection setup in the background.  Poll
    /// [`connect_result`](Self::connect_result) for the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`CommError::AlreadyStarted`] on a second call.
    pub fn connect(&self) -> Result<(), CommError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(CommError::AlreadyStarted);
        }
        self.shared.running.store(true, Ordering::SeqCst);

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("relay-{}-{}", self.shared.role, self.shared.port))
            .spawn(move || match shared.role {
                Role::Client => shared.run_client(),
                Role::Server => shared.run_server(),
            });
        match spawned {
            Ok(handle) => *lock(&self.setup) = Some(handle),
            Err(e) => {
                warn!("cannot spawn setup thread: {e}");
                self.shared.running.store(false, Ordering::SeqCst);
                self.shared.set_result(ConnectResult::CreateSocketFailure);
            }
        }
        Ok(())
    }

    pub fn connect_result(&self) -> ConnectResult {
        *lock(&self.shared.result)
    }

    pub fn role(&self) -> Role {
        self.shared.role
    }

    /// Host given at construction; empty for a server.
    pub fn ip(&self) -> &str {
        &self.shared.ip
    }

    /// Port given at construction.
    pub fn port(&self) -> &str {
        &self.shared.port
    }

    /// Port the server actually bound, once listening.
    pub fn local_port(&self) -> Option<u16> {
        self.shared.bound_port.get().copied()
    }

    pub fn remote_count(&self) -> usize {
        lock(&self.shared.remotes).len()
    }

    /// Replaces the waiter notified after every decoded message.
    pub fn set_waiter(&self, waiter: Option<Arc<Waiter>>) {
        *lock(&self.shared.waiter) = waiter;
    }

    /// Most recent fatal connection error seen by this endpoint.
    pub fn last_transport_error(&self) -> Option<TransportError> {
        lock(&self.shared.last_error).clone()
    }

    /// Interval statistics of received display-now messages.
    pub fn receive_stats(&self) -> &TimingStats {
        &self.shared.receive_stats
    }

    /// Sends `message` to the client's connection or to every registered
    /// server connection.  Returns how many connections it went to.
    ///
    /// # Errors
    ///
    /// `PayloadTooLarge` when the payload cannot be framed; nothing is sent
    /// and no connection is affected.  `NotConnected` for a client without a
    /// live connection.  In `Blocking` mode, the first connection's send
    /// error; the failing connection is torn down and later connections are
    /// skipped.
    pub fn send(&self, message: Message, mode: SendMode) -> Result<usize, TransportError> {
        self.send_shared(Arc::new(message), mode)
    }

    /// [`send`](Self::send) for a message the caller keeps a handle to.
    /// In `NonBlocking` mode every target queue holds one clone of the
    /// `Arc`, so the message is freed once the last connection has sent it.
    pub fn send_shared(&self, message: Arc<Message>, mode: SendMode) -> Result<usize, TransportError> {
        let len = message.payload.len();
        payload_len_field(len).map_err(|_| TransportError::PayloadTooLarge(len))?;
        let shared = &self.shared;
        match shared.role {
            Role::Client => {
                let conn = lock(&shared.local)
                    .clone()
                    .filter(|conn| conn.is_alive())
                    .ok_or(TransportError::NotConnected)?;
                match mode {
                    SendMode::NonBlocking => conn.enqueue_send(message),
                    SendMode::Blocking => {
                        if let Err(e) = conn.transmit(&message, &shared.settings) {
                            shared.connection_lost(&conn, None, e.clone());
                            return Err(e);
                        }
                    }
                }
                Ok(1)
            }
            Role::Server => match mode {
                SendMode::NonBlocking => {
                    let remotes = lock(&shared.remotes);
                    for (_, conn) in remotes.iter() {
                        conn.enqueue_send(Arc::clone(&message));
                    }
                    Ok(remotes.len())
                }
                SendMode::Blocking => {
                    let targets: Vec<(ConnectionHandle, Arc<Connection>)> = lock(&shared.remotes)
                        .iter()
                        .map(|(slot, conn)| (slot, Arc::clone(conn)))
                        .collect();
                    for (slot, conn) in &targets {
                        if let Err(e) = conn.transmit(&message, &shared.settings) {
                            shared.connection_lost(conn, Some(*slot), e.clone());
                            return Err(e);
                        }
                    }
                    Ok(targets.len())
                }
            },
        }
    }

    pub fn send_display_now(&self, name: impl Into<String>) -> Result<usize, TransportError> {
        self.send(Message::display_now(name), SendMode::NonBlocking)
    }

    pub fn send_image(&self, name: impl Into<String>, data: Vec<u8>) -> Result<usize, TransportError> {
        self.send(Message::image(name, data), SendMode::NonBlocking)
    }

    pub fn send_start_timer(&self) -> Result<usize, TransportError> {
        self.send(Message::start_timer(), SendMode::NonBlocking)
    }

    pub fn send_ack(&self, name: impl Into<String>) -> Result<usize, TransportError> {
        self.send(Message::ack(name), SendMode::NonBlocking)
    }

    /// Pops the oldest decoded message.  Never blocks beyond the inbox lock.
    pub fn next_received(&self) -> Option<Message> {
        lock(&self.shared.inbox).pop_front()
    }

    pub fn received_len(&self) -> usize {
        lock(&self.shared.inbox).len()
    }

    /// Stops the setup thread and every connection, joining all workers.
    /// Safe to call more than once.
    pub fn disconnect(&self) {
        let shared = &self.shared;
        shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = lock(&self.setup).take() {
            if handle.join().is_err() {
                warn!("setup thread for {} {} panicked", shared.role, shared.port);
            }
        }
        if let Some(local) = lock(&shared.local).take() {
            local.stop();
        }
        let remotes = lock(&shared.remotes).drain();
        for conn in remotes {
            conn.stop();
        }
        shared.reap_retired();
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("role", &self.shared.role)
            .field("ip", &self.shared.ip)
            .field("port", &self.shared.port)
            .field("result", &self.connect_result())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
