//! Participants and messages.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Recipient meaning "every current participant".
pub const BROADCAST: &str = "everyone";

/// Text of the status message appended when a participant joins.
pub const JOIN_NOTICE: &str = "joined the room...";

/// Text of the status message appended when a participant is evicted.
pub const LEAVE_NOTICE: &str = "left the room...";

/// A registered participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Unique name, immutable once registered.
    pub name: String,
    /// Last heartbeat (or join), epoch milliseconds.
    #[serde(rename = "lastStatus")]
    pub last_seen: i64,
}

impl Participant {
    /// Create a participant seen at `at`.
    #[must_use]
    pub fn new(name: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            last_seen: at.timestamp_millis(),
        }
    }

    /// Whether this participant's last heartbeat predates `cutoff`.
    #[must_use]
    pub const fn is_stale(&self, cutoff: i64) -> bool {
        self.last_seen < cutoff
    }
}

/// Message kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Regular message.
    Message,
    /// Message meant for its recipient only.
    PrivateMessage,
    /// Join/leave notice generated by the server.
    Status,
}

impl MessageKind {
    /// Wire name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::PrivateMessage => "private_message",
            Self::Status => "status",
        }
    }

    /// Parse a wire name, including `status`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "message" => Some(Self::Message),
            "private_message" => Some(Self::PrivateMessage),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    /// Parse a kind a client is allowed to send. `status` is server-only.
    #[must_use]
    pub fn parse_client(raw: &str) -> Option<Self> {
        Self::parse(raw).filter(|kind| *kind != Self::Status)
    }
}

/// A message in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Sender name.
    pub from: String,
    /// `BROADCAST` or a participant name.
    pub to: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Server time of insertion, `HH:MM:SS`.
    pub time: String,
}

impl Message {
    /// Build a message stamped at `at`.
    #[must_use]
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        text: impl Into<String>,
        kind: MessageKind,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            text: text.into(),
            kind,
            time: format_time(at),
        }
    }

    /// Broadcast status notice authored on behalf of `name`.
    #[must_use]
    pub fn status(name: impl Into<String>, text: &str, at: DateTime<Utc>) -> Self {
        Self::new(name, BROADCAST, text, MessageKind::Status, at)
    }

    /// Whether this message goes to everyone.
    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        self.to == BROADCAST
    }
}

/// Render an instant as server-local `HH:MM:SS`.
#[must_use]
pub fn format_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}
