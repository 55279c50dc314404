//! # Notification Broadcaster
//!
//! The `Broadcaster` owns the set of currently connected real-time clients and
//! pushes each change event to all of them.
//!
//! ## Design:
//!
//! 1.  **Serialize once, share everywhere**: an event is rendered to JSON text a
//!     single time and wrapped in an `Arc<str>`. Every client receives a clone of
//!     the pointer, not of the text.
//!
//! 2.  **Bounded channel per client**: registration stores the sending half of a
//!     bounded MPSC channel. The client's socket task drains the receiving half
//!     into the WebSocket. When that task ends (peer gone, write failed) the
//!     receiver is dropped and the next send to it fails. A client that stops
//!     reading fills its queue, and the next send to it fails as well, so a
//!     stalled peer is evicted instead of buffering without limit.
//!
//! 3.  **Snapshot, then prune**: `broadcast` copies the registry, attempts every
//!     delivery without holding the lock and without waiting, and only then
//!     removes the clients whose send failed. One dead client never stops delivery to the others, and
//!     nothing is ever reported to the caller as an error.
//!
//! Connection lifecycle is `Connecting -> Open -> Closed`. Ids are allocated from
//! a monotonic counter, so a closed id is never handed out again.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};

use super::notification::Notification;

/// A serialized notification as delivered to clients.
pub type Frame = Arc<str>;

/// Frames a client may have queued before it counts as stalled.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Identifier of one real-time connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// The raw numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// An id was allocated but the connection is not registered yet.
    Connecting,
    /// Registered and eligible for broadcasts.
    Open,
    /// Unregistered or dropped after a failed send. Terminal.
    Closed,
}

/// # Client Handle
///
/// The registry's view of one connection: its id and the channel that feeds its
/// socket writer.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    id: ConnectionId,
    sender: mpsc::Sender<Frame>,
}

impl ClientHandle {
    /// Wraps an allocated id and the sending half of the client's frame channel.
    pub fn new(id: ConnectionId, sender: mpsc::Sender<Frame>) -> Self {
        Self { id, sender }
    }

    /// The connection id.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Outcome of a single `broadcast` call. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Connections present in the registry when the broadcast started.
    pub attempted: usize,
    /// Connections whose send succeeded.
    pub delivered: usize,
    /// Connections whose send failed (gone or queue full) and which were removed.
    pub dropped: Vec<ConnectionId>,
}

#[derive(Default)]
struct Registry {
    clients: Vec<ClientHandle>,
    pending: HashSet<ConnectionId>,
    next_id: u64,
}

/// # Broadcaster
///
/// Process-wide registry of connected clients with best-effort fan-out.
/// Share it behind an `Arc`.
pub struct Broadcaster {
    registry: Mutex<Registry>,
    queue_capacity: usize,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::with_queue_capacity(DEFAULT_QUEUE_CAPACITY)
    }
}

impl Broadcaster {
    /// Creates an empty registry with [`DEFAULT_QUEUE_CAPACITY`] frames per client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry whose clients may queue `capacity` frames.
    pub fn with_queue_capacity(capacity: usize) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            queue_capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // A panic while holding the lock leaves the Vec/HashSet intact.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserves a fresh connection id in the `Connecting` state.
    pub fn allocate_id(&self) -> ConnectionId {
        let mut reg = self.lock();
        let id = ConnectionId(reg.next_id);
        reg.next_id += 1;
        reg.pending.insert(id);
        id
    }

    /// # Register
    ///
    /// Moves a connection from `Connecting` to `Open`; from now on it receives
    /// every broadcast.
    ///
    /// Returns `false` and leaves the registry untouched when the id was never
    /// allocated here, is already open, or has been closed.
    pub fn register(&self, handle: ClientHandle) -> bool {
        let mut reg = self.lock();
        if !reg.pending.remove(&handle.id) {
            log::warn!("Refusing to register connection {}: not awaiting registration", handle.id);
            return false;
        }
        log::info!("Connection {} registered", handle.id);
        reg.clients.push(handle);
        true
    }

    /// Allocates an id, creates the frame channel and registers the client in one
    /// step. The receiver must be drained by the connection's writer task.
    pub fn connect(&self) -> (ConnectionId, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let id = self.allocate_id();
        self.register(ClientHandle::new(id, tx));
        (id, rx)
    }

    /// # Unregister
    ///
    /// Closes a connection. Idempotent: unknown or already-closed ids are a no-op.
    /// Returns whether an open connection was removed.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let mut reg = self.lock();
        reg.pending.remove(&id);
        let before = reg.clients.len();
        reg.clients.retain(|c| c.id != id);
        let removed = reg.clients.len() != before;
        if removed {
            log::info!("Connection {} unregistered", id);
        }
        removed
    }

    /// # Broadcast
    ///
    /// Delivers `event` to every connection registered at call time.
    ///
    /// Never fails: a serialization error is logged and nothing is sent; a failed
    /// per-client send removes that client and delivery continues with the rest.
    pub fn broadcast(&self, event: &Notification) -> Delivery {
        match event.to_text() {
            Ok(text) => self.broadcast_frame(Frame::from(text)),
            Err(e) => {
                log::error!("Failed to serialize '{}' notification: {}", event.kind, e);
                Delivery::default()
            }
        }
    }

    /// Fan-out of an already serialized frame. See [`Broadcaster::broadcast`].
    pub fn broadcast_frame(&self, frame: Frame) -> Delivery {
        let snapshot: Vec<ClientHandle> = self.lock().clients.clone();

        let mut delivered = 0;
        let mut dropped = Vec::new();
        for client in &snapshot {
            match client.sender.try_send(Arc::clone(&frame)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    log::warn!("Connection {} stopped reading. Removing from registry.", client.id);
                    dropped.push(client.id);
                }
                Err(TrySendError::Closed(_)) => {
                    log::info!("Connection {} is gone. Removing from registry.", client.id);
                    dropped.push(client.id);
                }
            }
        }

        if !dropped.is_empty() {
            self.lock().clients.retain(|c| !dropped.contains(&c.id));
        }

        log::debug!(
            "Broadcast delivered to {}/{} connections",
            delivered,
            snapshot.len()
        );
        Delivery {
            attempted: snapshot.len(),
            delivered,
            dropped,
        }
    }

    /// Lifecycle state of `id`, or `None` if it was never allocated here.
    pub fn state(&self, id: ConnectionId) -> Option<ConnectionState> {
        let reg = self.lock();
        if reg.clients.iter().any(|c| c.id == id) {
            Some(ConnectionState::Open)
        } else if reg.pending.contains(&id) {
            Some(ConnectionState::Connecting)
        } else if id.0 < reg.next_id {
            Some(ConnectionState::Closed)
        } else {
            None
        }
    }

    /// Whether `id` is currently open.
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().clients.iter().any(|c| c.id == id)
    }

    /// Ids of all open connections, in registration order.
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.lock().clients.iter().map(|c| c.id).collect()
    }

    /// Number of open connections.
    pub fn len(&self) -> usize {
        self.lock().clients.len()
    }

    /// Whether no connection is open.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
