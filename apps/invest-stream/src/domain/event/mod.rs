//! Streaming Event Types
//!
//! Wire format types for the market data streaming protocol. Every inbound
//! message is a JSON envelope `{"event": "<kind>", "payload": {...}}`; the
//! payload shape depends on the kind.
//!
//! # Event Kinds
//!
//! - `candle`: OHLCV candle updates for a subscribed instrument/interval
//! - `orderbook`: order book snapshots at a subscribed depth
//! - `instrument_info`: trading status and instrument parameters
//! - `error`: server-side errors, correlated via `request_id` when present
//!
//! Two lifecycle markers, `startup` and `cleanup`, never appear on the wire;
//! they address handlers that run at the boundaries of a connection attempt.
//! Kinds outside the closed set are carried as [`EventKind::Other`] and their
//! payloads pass through undecoded.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Event Kind
// =============================================================================

/// Category of a streaming event or lifecycle hook.
///
/// Matching is exact: a handler registered under one kind is only ever
/// invoked for events of that kind, with no wildcarding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Price candle updates.
    Candle,
    /// Order book depth updates.
    Orderbook,
    /// Instrument status updates.
    InstrumentInfo,
    /// Server-reported errors.
    Error,
    /// Runs once per connection attempt, before any frame is read.
    Startup,
    /// Runs once per connection attempt, after the loop exits.
    Cleanup,
    /// Any kind outside the closed set; payloads pass through undecoded.
    Other(String),
}

impl EventKind {
    /// Parse a wire event name into a kind.
    #[must_use]
    pub fn from_wire(name: &str) -> Self {
        match name {
            "candle" => Self::Candle,
            "orderbook" => Self::Orderbook,
            "instrument_info" => Self::InstrumentInfo,
            "error" => Self::Error,
            "startup" => Self::Startup,
            "cleanup" => Self::Cleanup,
            other => Self::Other(other.to_string()),
        }
    }

    /// Wire name of this kind.
    #[must_use]
    pub fn as_wire(&self) -> &str {
        match self {
            Self::Candle => "candle",
            Self::Orderbook => "orderbook",
            Self::InstrumentInfo => "instrument_info",
            Self::Error => "error",
            Self::Startup => "startup",
            Self::Cleanup => "cleanup",
            Self::Other(name) => name,
        }
    }

    /// Whether a typed decoder exists for this kind in the standard table.
    #[must_use]
    pub const fn is_decodable(&self) -> bool {
        matches!(
            self,
            Self::Candle | Self::Orderbook | Self::InstrumentInfo | Self::Error
        )
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire())
    }
}

// =============================================================================
// Candle Resolution
// =============================================================================

/// Error returned when a candle interval is not in the supported set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid candle interval {value:?}, expected one of {allowed:?}")]
pub struct ResolutionParseError {
    /// The rejected interval string.
    pub value: String,
    /// The full set of accepted wire names.
    pub allowed: &'static [&'static str],
}

/// Candle aggregation interval accepted by the streaming API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandleResolution {
    /// One minute.
    #[serde(rename = "1min")]
    Min1,
    /// Two minutes.
    #[serde(rename = "2min")]
    Min2,
    /// Three minutes.
    #[serde(rename = "3min")]
    Min3,
    /// Five minutes.
    #[serde(rename = "5min")]
    Min5,
    /// Ten minutes.
    #[serde(rename = "10min")]
    Min10,
    /// Fifteen minutes.
    #[serde(rename = "15min")]
    Min15,
    /// Thirty minutes.
    #[serde(rename = "30min")]
    Min30,
    /// One hour.
    #[serde(rename = "hour")]
    Hour,
    /// One day.
    #[serde(rename = "day")]
    Day,
    /// One week.
    #[serde(rename = "week")]
    Week,
    /// One month.
    #[serde(rename = "month")]
    Month,
}

impl CandleResolution {
    /// Wire names of every supported resolution, in ascending order.
    pub const WIRE_NAMES: &'static [&'static str] = &[
        "1min", "2min", "3min", "5min", "10min", "15min", "30min", "hour", "day", "week", "month",
    ];

    /// Wire name of this resolution.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Min1 => "1min",
            Self::Min2 => "2min",
            Self::Min3 => "3min",
            Self::Min5 => "5min",
            Self::Min10 => "10min",
            Self::Min15 => "15min",
            Self::Min30 => "30min",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

impl std::str::FromStr for CandleResolution {
    type Err = ResolutionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1min" => Ok(Self::Min1),
            "2min" => Ok(Self::Min2),
            "3min" => Ok(Self::Min3),
            "5min" => Ok(Self::Min5),
            "10min" => Ok(Self::Min10),
            "15min" => Ok(Self::Min15),
            "30min" => Ok(Self::Min30),
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(ResolutionParseError {
                value: other.to_string(),
                allowed: Self::WIRE_NAMES,
            }),
        }
    }
}

impl std::fmt::Display for CandleResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Typed Payloads
// =============================================================================

/// Candle update payload.
///
/// # Wire Format (JSON)
/// ```json
/// {"o":64.5,"c":64.9,"h":65.1,"l":64.4,"v":156,
///  "time":"2019-08-07T15:35:00Z","interval":"5min","figi":"BBG0013HGFT4"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandlePayload {
    /// Open price.
    #[serde(rename = "o")]
    pub open: Decimal,
    /// Close price.
    #[serde(rename = "c")]
    pub close: Decimal,
    /// High price.
    #[serde(rename = "h")]
    pub high: Decimal,
    /// Low price.
    #[serde(rename = "l")]
    pub low: Decimal,
    /// Traded volume.
    #[serde(rename = "v")]
    pub volume: u64,
    /// Candle open time.
    pub time: DateTime<Utc>,
    /// Aggregation interval.
    pub interval: CandleResolution,
    /// Instrument identifier.
    pub figi: String,
}

/// A single price level: `(price, quantity)`.
pub type PriceLevel = (Decimal, Decimal);

/// Order book snapshot payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderbookPayload {
    /// Instrument identifier.
    pub figi: String,
    /// Snapshot depth.
    pub depth: u32,
    /// Bid levels, best first.
    pub bids: Vec<PriceLevel>,
    /// Ask levels, best first.
    pub asks: Vec<PriceLevel>,
}

/// Instrument status payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentInfoPayload {
    /// Instrument identifier.
    pub figi: String,
    /// Current trading status.
    pub trade_status: String,
    /// Minimum price step.
    pub min_price_increment: Decimal,
    /// Lot size.
    pub lot: Decimal,
    /// Accrued interest, for bonds.
    #[serde(default)]
    pub accrued_interest: Option<Decimal>,
    /// Upper price limit, if restricted.
    #[serde(default)]
    pub limit_up: Option<Decimal>,
    /// Lower price limit, if restricted.
    #[serde(default)]
    pub limit_down: Option<Decimal>,
}

/// Server-side error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Error description.
    pub error: String,
    /// Echo of the `request_id` from the offending command, when available.
    #[serde(default)]
    pub request_id: Option<String>,
}

// =============================================================================
// Frames and Decoded Events
// =============================================================================

/// Raw inbound envelope, parsed from one wire message and consumed by exactly
/// one dispatch cycle.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    /// Wire event name.
    pub event: String,
    /// Undecoded payload.
    pub payload: serde_json::Value,
}

/// Decoded payload handed to handlers.
#[derive(Debug, Clone)]
pub enum EventPayload {
    /// A decoded candle update.
    Candle(CandlePayload),
    /// A decoded order book snapshot.
    Orderbook(OrderbookPayload),
    /// A decoded instrument status update.
    InstrumentInfo(InstrumentInfoPayload),
    /// A decoded server error.
    Error(ErrorPayload),
    /// Raw payload for kinds without a registered decoder.
    Raw(serde_json::Value),
    /// No payload; lifecycle invocations carry this.
    None,
}

/// One decoded event: the kind plus its typed-or-raw payload.
#[derive(Debug, Clone)]
pub struct StreamEvent {
    /// Event category.
    pub kind: EventKind,
    /// Typed payload when a decoder is registered for the kind, raw otherwise.
    pub payload: EventPayload,
}

impl StreamEvent {
    /// Build a payload-less lifecycle event.
    #[must_use]
    pub const fn lifecycle(kind: EventKind) -> Self {
        Self {
            kind,
            payload: EventPayload::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn event_kind_wire_round_trip() {
        for name in [
            "candle",
            "orderbook",
            "instrument_info",
            "error",
            "startup",
            "cleanup",
        ] {
            assert_eq!(EventKind::from_wire(name).as_wire(), name);
        }
        assert_eq!(
            EventKind::from_wire("pong"),
            EventKind::Other("pong".to_string())
        );
        assert_eq!(EventKind::from_wire("pong").as_wire(), "pong");
    }

    #[test]
    fn decodable_kinds() {
        assert!(EventKind::Candle.is_decodable());
        assert!(EventKind::Orderbook.is_decodable());
        assert!(EventKind::InstrumentInfo.is_decodable());
        assert!(EventKind::Error.is_decodable());
        assert!(!EventKind::Startup.is_decodable());
        assert!(!EventKind::Cleanup.is_decodable());
        assert!(!EventKind::Other("pong".to_string()).is_decodable());
    }

    #[test]
    fn resolution_parses_every_wire_name() {
        for name in CandleResolution::WIRE_NAMES {
            let parsed = CandleResolution::from_str(name).unwrap();
            assert_eq!(parsed.as_str(), *name);
        }
    }

    #[test]
    fn resolution_rejects_unknown_interval() {
        let err = CandleResolution::from_str("45min").unwrap_err();
        assert_eq!(err.value, "45min");
        assert_eq!(err.allowed, CandleResolution::WIRE_NAMES);
        let rendered = err.to_string();
        assert!(rendered.contains("45min"));
        assert!(rendered.contains("1min"));
    }

    #[test]
    fn candle_payload_decodes_short_field_names() {
        let json = r#"{
            "o": 64.5, "c": 64.9, "h": 65.1, "l": 64.4, "v": 156,
            "time": "2019-08-07T15:35:00Z", "interval": "5min",
            "figi": "BBG0013HGFT4"
        }"#;

        let candle: CandlePayload = serde_json::from_str(json).unwrap();
        assert_eq!(candle.open, Decimal::new(645, 1));
        assert_eq!(candle.volume, 156);
        assert_eq!(candle.interval, CandleResolution::Min5);
        assert_eq!(candle.figi, "BBG0013HGFT4");
    }

    #[test]
    fn orderbook_payload_decodes_level_pairs() {
        let json = r#"{
            "figi": "BBG0013HGFT4", "depth": 2,
            "bids": [[64.38, 100], [64.37, 50]],
            "asks": [[64.41, 200]]
        }"#;

        let book: OrderbookPayload = serde_json::from_str(json).unwrap();
        assert_eq!(book.depth, 2);
        assert_eq!(book.bids.len(), 2);
        assert_eq!(book.bids[0].1, Decimal::new(100, 0));
        assert_eq!(book.asks[0].0, Decimal::new(6441, 2));
    }

    #[test]
    fn instrument_info_optional_fields_default() {
        let json = r#"{
            "figi": "BBG0013HGFT4", "trade_status": "normal_trading",
            "min_price_increment": 0.0025, "lot": 1000
        }"#;

        let info: InstrumentInfoPayload = serde_json::from_str(json).unwrap();
        assert_eq!(info.trade_status, "normal_trading");
        assert!(info.accrued_interest.is_none());
        assert!(info.limit_up.is_none());
    }

    #[test]
    fn error_payload_keeps_request_id() {
        let json = r#"{"error": "Subscription limit exceeded", "request_id": "req-1"}"#;
        let err: ErrorPayload = serde_json::from_str(json).unwrap();
        assert_eq!(err.request_id.as_deref(), Some("req-1"));
    }
}
