//! Room lifecycle and game state for the gomoku backend.
//!
//! A room moves `waiting → playing → finished`, with a reset edge back to
//! `waiting` when a player leaves mid-game. Status is also the storage
//! partition, so every status change is saved together with the status it
//! came from.
//!
//! # Key types
//!
//! - [`RoomService`] — create, join, move, leave and the read operations
//! - [`Reaper`] — periodic retirement of idle rooms
//! - [`ServiceConfig`] — timeouts and the sweep interval
//! - [`RoomError`] — what can go wrong, with wire codes
//!
//! The pure board rules live in [`board`].

pub mod board;
mod config;
mod error;
mod reaper;
mod service;

pub use config::ServiceConfig;
pub use error::RoomError;
pub use reaper::{Reaper, ReaperHandle, SweepReport};
pub use service::{LeaveOutcome, MAX_NICKNAME_LEN, RoomService, validate_nickname};
