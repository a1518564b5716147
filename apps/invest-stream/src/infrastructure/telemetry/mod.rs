//! Tracing Integration
//!
//! Initializes the `tracing` subscriber for the binary. The engine itself
//! only emits `tracing` events; embedding applications bring their own
//! subscriber.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: standard `EnvFilter` directives (default: `info`)

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the global tracing subscriber.
///
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init();
}
