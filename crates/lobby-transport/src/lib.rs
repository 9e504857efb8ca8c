//! Transport layer for the lobby chat backend.
//!
//! Provides:
//! - Wire types for request bodies and query strings
//! - HTTP router over `ChatService` (feature: http)

pub mod protocol;

#[cfg(feature = "http")]
pub mod http;

pub use protocol::{JoinRequest, MessagesQuery, SendRequest, USER_HEADER};
