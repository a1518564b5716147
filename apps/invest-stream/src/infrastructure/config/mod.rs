//! Configuration Module
//!
//! Engine and binary settings, loaded from environment variables.

mod settings;

pub use settings::{ConfigError, StreamingConfig, WatchSettings, STREAMING_URL};
