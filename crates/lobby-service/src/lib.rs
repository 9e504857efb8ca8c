//! Presence orchestration and storage for the lobby chat backend.
//!
//! Provides:
//! - `ChatService` - Join, heartbeat, send and read operations
//! - `SweeperHandle` - Background eviction of idle participants
//! - Storage implementations (memory, SQLite)

pub mod service;
pub mod storage;
pub mod sweeper;

pub use service::{ChatError, ChatService};
pub use sweeper::{SweepReport, SweeperHandle};
