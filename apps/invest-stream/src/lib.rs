#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Invest Stream - Market Data Streaming Engine
//!
//! A client for the Tinkoff OpenAPI market data WebSocket that maintains one
//! persistent duplex connection, decodes inbound events, fans them out to
//! registered handlers, and reconnects automatically after transient
//! failures. Callers register handlers once; subscription commands are
//! issued from handlers (typically a `startup` hook) and re-issued naturally
//! on every reconnect.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Event kinds, payloads, and the handler registry
//!   - `event`: wire payload types and the decoded event envelope
//!   - `registry`: ordered, append-only handler registration
//!
//! - **Application**: Port definitions
//!   - `ports`: the duplex transport contract the engine runs over
//!
//! - **Infrastructure**: Adapters and the engine itself
//!   - `stream`: dispatch loop, handler executor, subscriptions, reconnect
//!   - `transport`: `tokio-tungstenite` implementation of the ports
//!   - `config`: configuration from environment variables
//!   - `telemetry`: tracing subscriber setup for the binary
//!   - `metrics`: counter names and recording helpers
//!
//! # Data Flow
//!
//! ```text
//!                 ┌───────────┐     ┌──────────────┐     ┌───────────────┐
//! WebSocket ─────►│  Session  │────►│  Dispatcher  │────►│ Handlers      │
//!                 │ (1/attempt)│    │ decode+fanout│     │ (async/block) │
//!                 └───────────┘     └──────────────┘     └───────────────┘
//!                       ▲                  │ exit
//!                       │            ┌─────▼─────┐
//!                       └────────────│ Reconnect │ fixed delay, unbounded
//!                                    └───────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core streaming types with no transport dependencies.
pub mod domain;

/// Application layer - Port definitions.
pub mod application;

/// Infrastructure layer - Adapters and the streaming engine.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::event::{
    CandlePayload, CandleResolution, ErrorPayload, EventKind, EventPayload, InboundFrame,
    InstrumentInfoPayload, OrderbookPayload, PriceLevel, ResolutionParseError, StreamEvent,
};
pub use domain::registry::{Handler, HandlerRegistry, HandlerResult};

// Ports
pub use application::ports::{
    ConnectOptions, FrameSink, Session, Token, TokenError, Transport, TransportError,
};

// Engine
pub use infrastructure::stream::{
    parse_frame, CandleSubscription, CodecError, DecoderTable, DispatchError, DispatchOutcome,
    EventDispatcher, HandlerExecutor, InstrumentInfoSubscription, OrderbookSubscription,
    ReconnectPolicy, Registry, SharedState, StateError, Streaming, StreamingContext,
    SubscribeError, ValidationError,
};

// Infrastructure config
pub use infrastructure::config::{ConfigError, StreamingConfig, WatchSettings, STREAMING_URL};

// WebSocket transport
pub use infrastructure::transport::WsTransport;
