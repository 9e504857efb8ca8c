//! Wire types for client requests.
//!
//! Responses reuse the core `Participant` and `Message` serializations.

use lobby_core::visibility;
use serde::{Deserialize, Serialize};

/// Header carrying the acting participant's name.
pub const USER_HEADER: &str = "user";

/// Body of `POST /participants`.
///
/// Fields are optional so that a missing field reaches validation instead of
/// failing deserialization. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinRequest {
    pub name: Option<String>,
}

/// Body of `POST /messages`. The sender comes from the `User` header, never
/// from the body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendRequest {
    pub to: Option<String>,
    pub text: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Query of `GET /messages`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagesQuery {
    /// Raw limit; anything but a positive integer means "no limit".
    pub limit: Option<String>,
}

impl MessagesQuery {
    /// Effective tail limit.
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        visibility::parse_limit(self.limit.as_deref())
    }
}
