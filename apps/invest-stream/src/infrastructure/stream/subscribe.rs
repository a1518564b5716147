//! Subscription Builders
//!
//! One builder per event kind. Each validates its parameters synchronously,
//! before any I/O, then writes exactly one command frame to the active
//! session's send path. Sends are fire-and-forget: acknowledgments, if any,
//! arrive as ordinary inbound frames of the subscribed kind or of kind
//! `error`.
//!
//! # Wire Format
//!
//! ```json
//! {"event": "candle:subscribe", "figi": "BBG0013HGFT4",
//!  "interval": "5min", "request_id": "r1"}
//! ```
//!
//! `request_id` is serialized only when provided.

use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use crate::application::ports::{FrameSink, TransportError};
use crate::domain::event::{CandleResolution, EventKind, ResolutionParseError};

/// Rejected subscribe/unsubscribe parameters.
///
/// Raised synchronously at the call site before any network I/O; never
/// retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The candle interval is not in the supported set.
    #[error(transparent)]
    Interval(#[from] ResolutionParseError),

    /// The order book depth is outside `0 < depth <= 20`.
    #[error("orderbook depth must satisfy 0 < depth <= 20, got {0}")]
    Depth(u32),
}

/// Failure of a subscribe/unsubscribe call.
#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    /// Parameters were rejected before any send.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Serializing the command frame failed.
    #[error("failed to encode command frame: {0}")]
    Encode(#[from] serde_json::Error),

    /// The outbound write failed; the governing dispatch loop observes the
    /// same condition and tears the connection attempt down.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Maximum order book depth accepted by the API.
const MAX_ORDERBOOK_DEPTH: u32 = 20;

#[derive(Debug, Clone, Copy)]
enum Action {
    Subscribe,
    Unsubscribe,
}

impl Action {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
        }
    }
}

fn command_event(kind: &EventKind, action: Action) -> String {
    format!("{}:{}", kind.as_wire(), action.as_str())
}

#[derive(Serialize)]
struct CandleCommand<'a> {
    event: String,
    figi: &'a str,
    interval: CandleResolution,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<&'a str>,
}

#[derive(Serialize)]
struct OrderbookCommand<'a> {
    event: String,
    figi: &'a str,
    depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<&'a str>,
}

#[derive(Serialize)]
struct InstrumentInfoCommand<'a> {
    event: String,
    figi: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<&'a str>,
}

async fn send_command<T: Serialize>(
    sink: &Arc<dyn FrameSink>,
    command: &T,
) -> Result<(), SubscribeError> {
    let frame = serde_json::to_string(command)?;
    sink.send(frame).await?;
    Ok(())
}

// =============================================================================
// Candle
// =============================================================================

/// Candle subscription commands for the active session.
pub struct CandleSubscription {
    sink: Arc<dyn FrameSink>,
}

impl CandleSubscription {
    pub(crate) fn new(sink: Arc<dyn FrameSink>) -> Self {
        Self { sink }
    }

    /// Subscribe to candles for an instrument at an interval.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Interval`] (before any send) for intervals
    /// outside the supported set, or a transport error when the write fails.
    pub async fn subscribe(
        &self,
        figi: &str,
        interval: &str,
        request_id: Option<&str>,
    ) -> Result<(), SubscribeError> {
        self.send(Action::Subscribe, figi, interval, request_id)
            .await
    }

    /// Unsubscribe from candles for an instrument at an interval.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::subscribe`].
    pub async fn unsubscribe(
        &self,
        figi: &str,
        interval: &str,
        request_id: Option<&str>,
    ) -> Result<(), SubscribeError> {
        self.send(Action::Unsubscribe, figi, interval, request_id)
            .await
    }

    async fn send(
        &self,
        action: Action,
        figi: &str,
        interval: &str,
        request_id: Option<&str>,
    ) -> Result<(), SubscribeError> {
        let interval = CandleResolution::from_str(interval).map_err(ValidationError::Interval)?;
        let command = CandleCommand {
            event: command_event(&EventKind::Candle, action),
            figi,
            interval,
            request_id,
        };
        send_command(&self.sink, &command).await
    }
}

// =============================================================================
// Orderbook
// =============================================================================

/// Order book subscription commands for the active session.
pub struct OrderbookSubscription {
    sink: Arc<dyn FrameSink>,
}

impl OrderbookSubscription {
    pub(crate) fn new(sink: Arc<dyn FrameSink>) -> Self {
        Self { sink }
    }

    /// Subscribe to order book snapshots at a depth in `1..=20`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Depth`] (before any send) for depths
    /// outside the bound, or a transport error when the write fails.
    pub async fn subscribe(
        &self,
        figi: &str,
        depth: u32,
        request_id: Option<&str>,
    ) -> Result<(), SubscribeError> {
        self.send(Action::Subscribe, figi, depth, request_id).await
    }

    /// Unsubscribe from order book snapshots.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::subscribe`].
    pub async fn unsubscribe(
        &self,
        figi: &str,
        depth: u32,
        request_id: Option<&str>,
    ) -> Result<(), SubscribeError> {
        self.send(Action::Unsubscribe, figi, depth, request_id)
            .await
    }

    async fn send(
        &self,
        action: Action,
        figi: &str,
        depth: u32,
        request_id: Option<&str>,
    ) -> Result<(), SubscribeError> {
        if depth == 0 || depth > MAX_ORDERBOOK_DEPTH {
            return Err(ValidationError::Depth(depth).into());
        }
        let command = OrderbookCommand {
            event: command_event(&EventKind::Orderbook, action),
            figi,
            depth,
            request_id,
        };
        send_command(&self.sink, &command).await
    }
}

// =============================================================================
// Instrument Info
// =============================================================================

/// Instrument info subscription commands for the active session.
pub struct InstrumentInfoSubscription {
    sink: Arc<dyn FrameSink>,
}

impl InstrumentInfoSubscription {
    pub(crate) fn new(sink: Arc<dyn FrameSink>) -> Self {
        Self { sink }
    }

    /// Subscribe to instrument status updates.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the write fails.
    pub async fn subscribe(
        &self,
        figi: &str,
        request_id: Option<&str>,
    ) -> Result<(), SubscribeError> {
        self.send(Action::Subscribe, figi, request_id).await
    }

    /// Unsubscribe from instrument status updates.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the write fails.
    pub async fn unsubscribe(
        &self,
        figi: &str,
        request_id: Option<&str>,
    ) -> Result<(), SubscribeError> {
        self.send(Action::Unsubscribe, figi, request_id).await
    }

    async fn send(
        &self,
        action: Action,
        figi: &str,
        request_id: Option<&str>,
    ) -> Result<(), SubscribeError> {
        let command = InstrumentInfoCommand {
            event: command_event(&EventKind::InstrumentInfo, action),
            figi,
            request_id,
        };
        send_command(&self.sink, &command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use test_case::test_case;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl FrameSink for RecordingSink {
        async fn send(&self, frame: String) -> Result<(), TransportError> {
            self.sent.lock().push(frame);
            Ok(())
        }
    }

    fn sink() -> (Arc<RecordingSink>, Arc<dyn FrameSink>) {
        let recording = Arc::new(RecordingSink::default());
        let dyn_sink: Arc<dyn FrameSink> = Arc::clone(&recording) as Arc<dyn FrameSink>;
        (recording, dyn_sink)
    }

    #[tokio::test]
    async fn candle_subscribe_sends_one_frame() {
        let (recording, dyn_sink) = sink();
        let candle = CandleSubscription::new(dyn_sink);

        candle
            .subscribe("BBG0013HGFT4", "5min", Some("r1"))
            .await
            .unwrap();

        let sent = recording.sent.lock();
        assert_eq!(sent.len(), 1);
        let frame: serde_json::Value = serde_json::from_str(&sent[0]).unwrap();
        assert_eq!(frame["event"], "candle:subscribe");
        assert_eq!(frame["figi"], "BBG0013HGFT4");
        assert_eq!(frame["interval"], "5min");
        assert_eq!(frame["request_id"], "r1");
    }

    #[tokio::test]
    async fn candle_unsubscribe_omits_absent_request_id() {
        let (recording, dyn_sink) = sink();
        let candle = CandleSubscription::new(dyn_sink);

        candle
            .unsubscribe("BBG0013HGFT4", "1min", None)
            .await
            .unwrap();

        let sent = recording.sent.lock();
        let frame: serde_json::Value = serde_json::from_str(&sent[0]).unwrap();
        assert_eq!(frame["event"], "candle:unsubscribe");
        assert!(frame.get("request_id").is_none());
    }

    #[test_case("45min")]
    #[test_case("1h")]
    #[test_case("")]
    #[test_case("minute")]
    #[tokio::test]
    async fn candle_rejects_unknown_interval_without_sending(interval: &str) {
        let (recording, dyn_sink) = sink();
        let candle = CandleSubscription::new(dyn_sink);

        let err = candle
            .subscribe("BBG0013HGFT4", interval, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SubscribeError::Validation(ValidationError::Interval(_))
        ));
        assert!(recording.sent.lock().is_empty());

        let err = candle
            .unsubscribe("BBG0013HGFT4", interval, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SubscribeError::Validation(_)));
        assert!(recording.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn orderbook_subscribe_sends_depth() {
        let (recording, dyn_sink) = sink();
        let orderbook = OrderbookSubscription::new(dyn_sink);

        orderbook.subscribe("BBG0013HGFT4", 20, None).await.unwrap();

        let sent = recording.sent.lock();
        let frame: serde_json::Value = serde_json::from_str(&sent[0]).unwrap();
        assert_eq!(frame["event"], "orderbook:subscribe");
        assert_eq!(frame["depth"], 20);
    }

    #[test_case(0)]
    #[test_case(21)]
    #[test_case(25)]
    #[test_case(u32::MAX)]
    #[tokio::test]
    async fn orderbook_rejects_out_of_range_depth_without_sending(depth: u32) {
        let (recording, dyn_sink) = sink();
        let orderbook = OrderbookSubscription::new(dyn_sink);

        let err = orderbook
            .subscribe("BBG0013HGFT4", depth, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubscribeError::Validation(ValidationError::Depth(d)) if d == depth
        ));

        let err = orderbook
            .unsubscribe("BBG0013HGFT4", depth, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SubscribeError::Validation(_)));

        assert!(recording.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn instrument_info_round_trip() {
        let (recording, dyn_sink) = sink();
        let info = InstrumentInfoSubscription::new(dyn_sink);

        info.subscribe("BBG0013HGFT4", Some("r2")).await.unwrap();
        info.unsubscribe("BBG0013HGFT4", None).await.unwrap();

        let sent = recording.sent.lock();
        assert_eq!(sent.len(), 2);
        let first: serde_json::Value = serde_json::from_str(&sent[0]).unwrap();
        let second: serde_json::Value = serde_json::from_str(&sent[1]).unwrap();
        assert_eq!(first["event"], "instrument_info:subscribe");
        assert_eq!(first["request_id"], "r2");
        assert_eq!(second["event"], "instrument_info:unsubscribe");
    }

    #[tokio::test]
    async fn send_failure_surfaces_as_transport_error() {
        struct FailingSink;

        #[async_trait]
        impl FrameSink for FailingSink {
            async fn send(&self, _frame: String) -> Result<(), TransportError> {
                Err(TransportError::Send("broken pipe".to_string()))
            }
        }

        let info = InstrumentInfoSubscription::new(Arc::new(FailingSink));
        let err = info.subscribe("BBG0013HGFT4", None).await.unwrap_err();
        assert!(matches!(err, SubscribeError::Transport(_)));
    }
}
