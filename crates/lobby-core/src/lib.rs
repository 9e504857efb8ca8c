//! Core model for the lobby chat backend.
//!
//! This crate provides the fundamental building blocks:
//! - `Participant` / `Message` - The two persisted collections
//! - `Clock` - Injectable time source
//! - Visibility predicate and limit handling for message reads
//! - `ChatStore` trait for storage backends

pub mod clock;
pub mod config;
pub mod model;
pub mod traits;
pub mod visibility;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ChatConfig;
pub use model::{BROADCAST, Message, MessageKind, Participant};
pub use traits::{ChatStore, MessageFilter, StoreError};
