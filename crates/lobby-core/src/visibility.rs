//! Who may read which message.

use crate::model::Message;

/// A message is visible to `viewer` if it is a broadcast, or the viewer sent
/// it, or it is addressed to the viewer. Without a viewer only broadcasts
/// are visible.
#[must_use]
pub fn is_visible(message: &Message, viewer: Option<&str>) -> bool {
    message.is_broadcast() || viewer.is_some_and(|v| message.from == v || message.to == v)
}

/// Messages visible to `viewer`, in log order, keeping only the last `limit`
/// when a limit is given.
#[must_use]
pub fn select_visible<'a, I>(log: I, viewer: Option<&str>, limit: Option<usize>) -> Vec<Message>
where
    I: IntoIterator<Item = &'a Message>,
{
    let mut visible: Vec<Message> = log
        .into_iter()
        .filter(|m| is_visible(m, viewer))
        .cloned()
        .collect();

    if let Some(limit) = limit {
        let skip = visible.len().saturating_sub(limit);
        visible.drain(..skip);
    }

    visible
}

/// Interpret a raw `limit` parameter.
///
/// Only a positive integer yields a limit; anything else (absent, zero,
/// negative, garbage) means "everything".
#[must_use]
pub fn parse_limit(raw: Option<&str>) -> Option<usize> {
    raw?.trim()
        .parse::<i64>()
        .ok()
        .filter(|n| *n > 0)
        .and_then(|n| usize::try_from(n).ok())
}
