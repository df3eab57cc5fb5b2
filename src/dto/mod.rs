use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Activity feed and leaderboard payloads.
pub mod activity;
/// Health check payload.
pub mod health;
/// Payment webhook payload.
pub mod payment;
/// Pet views and action payloads.
pub mod pet;
/// Shop catalog payload.
pub mod shop;
/// Server-Sent Events payloads.
pub mod sse;
pub mod validation;
/// WebSocket protocol messages.
pub mod ws;

/// Render epoch milliseconds as an RFC 3339 timestamp.
fn format_epoch_ms(epoch_ms: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(epoch_ms) * 1_000_000)
        .ok()
        .and_then(|at| at.format(&Rfc3339).ok())
        .unwrap_or_else(|| "invalid-timestamp".into())
}
