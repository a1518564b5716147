//! Metrics Module
//!
//! Counter names and recording helpers for the streaming engine. Only the
//! `metrics` facade is used here; the embedding application decides which
//! recorder (if any) to install.
//!
//! # Metrics
//!
//! - `invest_stream_frames_total{kind}`: inbound frames by event kind
//! - `invest_stream_reconnects_total`: reconnect attempts
//! - `invest_stream_handler_errors_total{kind}`: failed handler completions
//! - `invest_stream_connections_total`: successful connects

use metrics::{counter, describe_counter};

use crate::domain::event::EventKind;

/// Inbound frames by event kind.
pub const FRAMES_TOTAL: &str = "invest_stream_frames_total";

/// Reconnect attempts after a failed or closed connection.
pub const RECONNECTS_TOTAL: &str = "invest_stream_reconnects_total";

/// Failed handler completions by event kind.
pub const HANDLER_ERRORS_TOTAL: &str = "invest_stream_handler_errors_total";

/// Successful connects.
pub const CONNECTIONS_TOTAL: &str = "invest_stream_connections_total";

/// Register metric descriptions with the installed recorder.
pub fn describe() {
    describe_counter!(FRAMES_TOTAL, "Inbound frames by event kind");
    describe_counter!(RECONNECTS_TOTAL, "Reconnect attempts");
    describe_counter!(HANDLER_ERRORS_TOTAL, "Failed handler completions");
    describe_counter!(CONNECTIONS_TOTAL, "Successful connects");
}

/// Record one inbound frame.
pub fn record_frame(kind: &EventKind) {
    counter!(FRAMES_TOTAL, "kind" => kind.as_wire().to_string()).increment(1);
}

/// Record one reconnect attempt.
pub fn record_reconnect() {
    counter!(RECONNECTS_TOTAL).increment(1);
}

/// Record one failed handler completion.
pub fn record_handler_error(kind: &EventKind) {
    counter!(HANDLER_ERRORS_TOTAL, "kind" => kind.as_wire().to_string()).increment(1);
}

/// Record one successful connect.
pub fn record_connection() {
    counter!(CONNECTIONS_TOTAL).increment(1);
}
