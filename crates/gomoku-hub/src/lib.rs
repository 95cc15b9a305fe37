//! Notification channels for gomoku rooms.
//!
//! Every room has a channel (a group of users). The room service pushes
//! snapshots to it after each mutation; delivery is best effort.
//!
//! # Key types
//!
//! - [`NotificationGateway`] — group-send and group-membership contract
//! - [`Hub`] — in-process implementation feeding per-connection queues
//! - [`Registration`] — a connection's handle on its queue

mod error;
mod gateway;
mod hub;

pub use error::GatewayError;
pub use gateway::NotificationGateway;
pub use gomoku_transport::ConnectionId;
pub use hub::{DEFAULT_QUEUE_CAPACITY, Hub, Registration};
