//! Client half of the poll-based synchronization protocol.
//!
//! Two independent pollers (each participant's client) converge on one
//! ordered history without a live channel. A send is rendered immediately as
//! a provisional timeline entry and reconciled when the server responds:
//! replaced in place on success, removed on failure. Background polls merge
//! by server id, so a poll racing the send response never duplicates a
//! message.

pub mod api;
pub mod client;
pub mod timeline;

pub use api::{ApiError, ChatApi, HttpChatApi};
pub use client::ChatClient;
pub use timeline::{EntryId, EntryState, Timeline, TimelineEntry};
