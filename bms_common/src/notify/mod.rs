//! # Notification Module
//!
//! Live fan-out of change events to every connected real-time client.
//!
//! - **`broadcaster`**: the process-wide client registry. Clients are registered
//!   once their WebSocket handshake completes and receive every broadcast frame
//!   through their own bounded channel. A failed send means the client's writer
//!   task has gone away or stopped draining its queue, so the client is dropped
//!   from the registry.
//!
//! - **`notification`**: the `{ "type": ..., "data": { ... } }` event record and
//!   the event kinds emitted by the inventory handlers.

/// The client registry and best-effort fan-out loop.
pub mod broadcaster;
/// The event record sent over the wire.
pub mod notification;

pub use broadcaster::{
    Broadcaster, ClientHandle, ConnectionId, ConnectionState, Delivery, Frame, DEFAULT_QUEUE_CAPACITY,
};
pub use notification::{kinds, Notification};
