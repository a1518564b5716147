//! Port Interfaces
//!
//! Contracts for the duplex transport the streaming engine runs over,
//! following the Hexagonal Architecture pattern: the engine only ever talks
//! to these traits, and infrastructure adapters (or test fakes) implement
//! them.
//!
//! ## Driven Ports (Outbound)
//!
//! - [`Transport`]: opens one authenticated duplex connection per call
//! - [`Session`]: the live connection handle for one connection attempt
//! - [`FrameSink`]: the session's single outbound send path
//!
//! A [`Session`] is never shared across reconnect attempts; every attempt
//! gets a fresh one from [`Transport::connect`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

// =============================================================================
// Errors
// =============================================================================

/// Failure at the transport boundary.
///
/// Transport errors are never fatal to the engine: the current connection
/// attempt is torn down and a new one is made after the configured delay.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Opening the connection failed.
    #[error("connect failed: {0}")]
    Connect(String),

    /// An outbound write failed.
    #[error("send failed: {0}")]
    Send(String),

    /// An inbound read failed.
    #[error("receive failed: {0}")]
    Recv(String),

    /// No frame arrived within the configured receive timeout.
    #[error("receive timed out after {0:?}")]
    RecvTimeout(Duration),

    /// Closing the connection failed.
    #[error("close failed: {0}")]
    Close(String),
}

// =============================================================================
// Bearer Token
// =============================================================================

/// Error constructing a [`Token`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// The token string was empty.
    #[error("token cannot be empty")]
    Empty,
}

/// Bearer token presented at connect time.
#[derive(Clone)]
pub struct Token(String);

impl Token {
    /// Create a token, rejecting empty strings.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Empty`] for an empty token.
    pub fn new(token: impl Into<String>) -> Result<Self, TokenError> {
        let token = token.into();
        if token.is_empty() {
            return Err(TokenError::Empty);
        }
        Ok(Self(token))
    }

    /// The raw token value.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Token").field(&"[REDACTED]").finish()
    }
}

// =============================================================================
// Connect Options
// =============================================================================

/// Connect-time configuration passed through to the transport.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// WebSocket endpoint.
    pub url: String,
    /// Bearer token for the `Authorization` header.
    pub token: Token,
    /// Ping interval keeping the connection alive; `None` disables pings.
    pub heartbeat: Option<Duration>,
    /// Maximum silence between inbound frames; `None` waits forever.
    pub receive_timeout: Option<Duration>,
    /// How long to wait for the close handshake; zero skips the wait.
    pub close_timeout: Duration,
}

// =============================================================================
// Traits
// =============================================================================

/// Opens authenticated duplex connections.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a fresh [`Session`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] when the connection cannot be
    /// established.
    async fn connect(&self, options: &ConnectOptions) -> Result<Box<dyn Session>, TransportError>;
}

/// The live connection handle for one connection attempt.
#[async_trait]
pub trait Session: Send {
    /// The session's outbound send path.
    ///
    /// The sink is shareable so that handlers can issue subscribe commands
    /// while the dispatch loop reads; implementations must make each `send`
    /// call atomic at the frame boundary.
    fn sender(&self) -> Arc<dyn FrameSink>;

    /// Await the next inbound text frame.
    ///
    /// Returns `Ok(Some(text))` for a data frame, `Ok(None)` for a benign
    /// close (server close frame or end of stream).
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the read fails or times out.
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;

    /// Close the session.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Close`] when the close handshake fails.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Outbound frame writer with atomic per-call writes.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Write one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Send`] when the write fails.
    async fn send(&self, frame: String) -> Result<(), TransportError>;
}
