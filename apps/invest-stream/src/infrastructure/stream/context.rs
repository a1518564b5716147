//! Streaming Context
//!
//! The handle every handler receives. It carries the active session's
//! outbound send path (via the typed subscription builders), and a shared
//! mutable state map that survives reconnects.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::application::ports::FrameSink;
use crate::infrastructure::stream::subscribe::{
    CandleSubscription, InstrumentInfoSubscription, OrderbookSubscription,
};

/// Error looking up shared state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// No entry exists under the requested key.
    #[error("no state entry for key {0:?}")]
    NotFound(String),
}

/// Key-addressable state shared by all handlers across reconnects.
#[derive(Debug, Default)]
pub struct SharedState {
    entries: RwLock<HashMap<String, serde_json::Value>>,
}

impl SharedState {
    /// Create state seeded with initial entries.
    #[must_use]
    pub fn with_entries(entries: HashMap<String, serde_json::Value>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Look up an entry by key.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NotFound`] for unknown keys.
    pub fn get(&self, key: &str) -> Result<serde_json::Value, StateError> {
        self.entries
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StateError::NotFound(key.to_string()))
    }

    /// Insert or replace an entry.
    pub fn set(&self, key: impl Into<String>, value: serde_json::Value) {
        self.entries.write().insert(key.into(), value);
    }
}

/// Handle passed to every handler invocation.
///
/// Cloning is cheap; the clone refers to the same session and state.
#[derive(Clone)]
pub struct StreamingContext {
    sink: Arc<dyn FrameSink>,
    state: Arc<SharedState>,
}

impl StreamingContext {
    /// Build a context around a session's send path and the shared state.
    #[must_use]
    pub fn new(sink: Arc<dyn FrameSink>, state: Arc<SharedState>) -> Self {
        Self { sink, state }
    }

    /// Candle subscription builder for the active session.
    #[must_use]
    pub fn candle(&self) -> CandleSubscription {
        CandleSubscription::new(Arc::clone(&self.sink))
    }

    /// Order book subscription builder for the active session.
    #[must_use]
    pub fn orderbook(&self) -> OrderbookSubscription {
        OrderbookSubscription::new(Arc::clone(&self.sink))
    }

    /// Instrument info subscription builder for the active session.
    #[must_use]
    pub fn instrument_info(&self) -> InstrumentInfoSubscription {
        InstrumentInfoSubscription::new(Arc::clone(&self.sink))
    }

    /// The session's outbound send path.
    #[must_use]
    pub fn sender(&self) -> Arc<dyn FrameSink> {
        Arc::clone(&self.sink)
    }

    /// Look up a shared state entry by key.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NotFound`] for unknown keys.
    pub fn state(&self, key: &str) -> Result<serde_json::Value, StateError> {
        self.state.get(key)
    }

    /// Insert or replace a shared state entry.
    pub fn set_state(&self, key: impl Into<String>, value: serde_json::Value) {
        self.state.set(key, value);
    }
}

impl std::fmt::Debug for StreamingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingContext").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_lookup_hits_and_misses() {
        let state = SharedState::with_entries(HashMap::from([(
            "portfolio".to_string(),
            serde_json::json!({"cash": 1000}),
        )]));

        assert_eq!(state.get("portfolio").unwrap()["cash"], 1000);
        assert_eq!(
            state.get("missing").unwrap_err(),
            StateError::NotFound("missing".to_string())
        );
    }

    #[test]
    fn state_set_replaces() {
        let state = SharedState::default();
        state.set("counter", serde_json::json!(1));
        state.set("counter", serde_json::json!(2));
        assert_eq!(state.get("counter").unwrap(), serde_json::json!(2));
    }
}
