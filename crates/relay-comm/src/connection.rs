//! One live socket with its outbound queue and worker threads.
//!
//! A [`Connection`] is always held as `Arc<Connection>`: the endpoint, the
//! send worker, and the receive worker each keep a handle.  Outbound
//! messages are queued as `Arc<Message>`, so a message fanned out to several
//! connections is stored once and freed when the last connection has sent
//! it.
//!
//! # Liveness
//!
//! `alive` starts `true`.  It is cleared by [`Connection::stop`] or by the
//! first fatal [`TransportError`]; both workers poll it between bounded
//! socket waits and exit once it is clear.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use relay_core::Message;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::pipeline::send_with_retry;
use crate::settings::CommSettings;

pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    outbound: Mutex<VecDeque<Arc<Message>>>,
    /// Serializes whole frames so a blocking send never interleaves with the
    /// send worker.
    writer: Mutex<()>,
    alive: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
    failure: Mutex<Option<TransportError>>,
}

impl Connection {
    /// Wraps a connected stream, applying the poll timeout to reads and writes.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the peer address or a socket option cannot be
    /// read or set.
    pub fn new(stream: TcpStream, settings: &CommSettings) -> io::Result<Self> {
        let peer = stream.peer_addr()?;
        stream.set_read_timeout(Some(settings.poll_timeout()))?;
        stream.set_write_timeout(Some(settings.poll_timeout()))?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            peer,
            outbound: Mutex::new(VecDeque::new()),
            writer: Mutex::new(()),
            alive: AtomicBool::new(true),
            workers: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Appends to the outbound FIFO.  Never blocks beyond the queue lock.
    pub fn enqueue_send(&self, message: Arc<Message>) {
        lock(&self.outbound).push_back(message);
    }

    /// Pops the oldest queued message, if any.
    pub fn dequeue_send(&self) -> Option<Arc<Message>> {
        lock(&self.outbound).pop_front()
    }

    pub fn queued(&self) -> usize {
        lock(&self.outbound).len()
    }

    /// Sends one message on the calling thread, retrying timeouts.
    ///
    /// # Errors
    ///
    /// Returns the error of the final attempt.  The caller decides whether
    /// it is fatal for this connection.
    pub fn transmit(&self, message: &Message, settings: &CommSettings) -> Result<usize, TransportError> {
        let _frame = lock(&self.writer);
        let mut stream = &self.stream;
        send_with_retry(&mut stream, message, settings)
    }

    pub(crate) fn read_chunk(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.stream).read(buf)
    }

    /// Records `error` as the reason this connection died and clears the
    /// liveness flag.  Returns `false` if a failure was already recorded.
    pub fn fail(&self, error: TransportError) -> bool {
        let mut failure = lock(&self.failure);
        self.alive.store(false, Ordering::SeqCst);
        if failure.is_some() {
            return false;
        }
        *failure = Some(error);
        true
    }

    /// The first fatal error, if the connection died of one.
    pub fn failure(&self) -> Option<TransportError> {
        lock(&self.failure).clone()
    }

    pub(crate) fn attach_worker(&self, handle: JoinHandle<()>) {
        lock(&self.workers).push(handle);
    }

    /// Clears the liveness flag, closes the socket, and joins the workers.
    ///
    /// When called from one of this connection's own workers, that worker
    /// is skipped rather than joined.
    pub fn stop(&self) {
        self.alive.store(false, Ordering::SeqCst);
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            debug!("shutdown of {} failed: {e}", self.peer);
        }
        let current = thread::current().id();
        let workers: Vec<JoinHandle<()>> = lock(&self.workers).drain(..).collect();
        for handle in workers {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                warn!("worker thread for {} panicked", self.peer);
            }
        }
        debug!("connection to {} stopped", self.peer);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .field("alive", &self.is_alive())
            .field("queued", &self.queued())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
