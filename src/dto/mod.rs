//! Wire types: inbound commands, outbound views and events, validation helpers.

use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod commands;
pub mod events;
pub mod health;
pub mod validation;
pub mod views;

/// Format a timestamp for the wire; RFC 3339 like every other payload field.
pub(crate) fn format_timestamp(timestamp: OffsetDateTime) -> String {
    timestamp
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
