//! Infrastructure layer - Adapters and runtime integrations.

/// Configuration loaded from environment variables.
pub mod config;

/// Metric names and recording helpers.
pub mod metrics;

/// The streaming engine: dispatch loop, executor, subscriptions, reconnect.
pub mod stream;

/// Tracing subscriber initialization.
pub mod telemetry;

/// WebSocket transport adapter.
pub mod transport;
