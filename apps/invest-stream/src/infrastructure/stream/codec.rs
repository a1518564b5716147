//! Frame Codec
//!
//! Parses the inbound text envelope and decodes payloads through a per-kind
//! decoder table. The standard table covers the closed kind set; callers may
//! register replacement or additional decoders before the engine starts.
//! Kinds without a decoder pass their payload through unchanged.

use std::collections::HashMap;

use crate::domain::event::{
    CandlePayload, ErrorPayload, EventKind, EventPayload, InboundFrame, InstrumentInfoPayload,
    OrderbookPayload,
};

/// Codec errors.
///
/// A payload decode failure is fatal for the connection attempt: the
/// dispatcher tears the attempt down and the engine reconnects after the
/// configured delay.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The frame is not a valid `{"event", "payload"}` envelope.
    #[error("malformed frame envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    /// A registered decoder rejected the payload.
    #[error("failed to decode {kind} payload: {source}")]
    Payload {
        /// Kind whose decoder rejected the payload.
        kind: EventKind,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Parse one wire message into the raw envelope.
///
/// # Errors
///
/// Returns [`CodecError::Envelope`] when the text is not a valid envelope.
pub fn parse_frame(text: &str) -> Result<InboundFrame, CodecError> {
    serde_json::from_str(text).map_err(CodecError::Envelope)
}

type BoxDecoder =
    Box<dyn Fn(serde_json::Value) -> Result<EventPayload, serde_json::Error> + Send + Sync>;

/// Event kind to typed-payload decoder mapping.
pub struct DecoderTable {
    decoders: HashMap<EventKind, BoxDecoder>,
}

impl Default for DecoderTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl DecoderTable {
    /// A table with no decoders; every payload passes through raw.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// The standard table: typed decoders for candle, orderbook,
    /// instrument_info, and error payloads.
    #[must_use]
    pub fn standard() -> Self {
        let mut table = Self::empty();
        table.register(EventKind::Candle, |payload| {
            serde_json::from_value::<CandlePayload>(payload).map(EventPayload::Candle)
        });
        table.register(EventKind::Orderbook, |payload| {
            serde_json::from_value::<OrderbookPayload>(payload).map(EventPayload::Orderbook)
        });
        table.register(EventKind::InstrumentInfo, |payload| {
            serde_json::from_value::<InstrumentInfoPayload>(payload)
                .map(EventPayload::InstrumentInfo)
        });
        table.register(EventKind::Error, |payload| {
            serde_json::from_value::<ErrorPayload>(payload).map(EventPayload::Error)
        });
        table
    }

    /// Register (or replace) the decoder for a kind.
    pub fn register<F>(&mut self, kind: EventKind, decoder: F) -> &mut Self
    where
        F: Fn(serde_json::Value) -> Result<EventPayload, serde_json::Error>
            + Send
            + Sync
            + 'static,
    {
        self.decoders.insert(kind, Box::new(decoder));
        self
    }

    /// Decode a payload for a kind; kinds without a decoder pass through.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Payload`] when the registered decoder rejects
    /// the payload.
    pub fn decode(
        &self,
        kind: &EventKind,
        payload: serde_json::Value,
    ) -> Result<EventPayload, CodecError> {
        match self.decoders.get(kind) {
            Some(decoder) => decoder(payload).map_err(|source| CodecError::Payload {
                kind: kind.clone(),
                source,
            }),
            None => Ok(EventPayload::Raw(payload)),
        }
    }
}

impl std::fmt::Debug for DecoderTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderTable")
            .field("kinds", &self.decoders.keys().collect::<Vec<_>>())
            .finish()
    }
}
