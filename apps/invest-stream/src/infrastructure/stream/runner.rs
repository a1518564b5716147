//! Streaming Orchestrator
//!
//! Owns the outer connect/dispatch/reconnect loop. Each iteration opens a
//! fresh session, hands it to the [`EventDispatcher`], and afterwards either
//! stops (cancellation) or sleeps the fixed reconnect delay and connects
//! again. There is no retry bound and no backoff; the delay is fixed per
//! configuration.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::application::ports::{ConnectOptions, Session as _, Transport};
use crate::domain::registry::HandlerRegistry;
use crate::infrastructure::config::StreamingConfig;
use crate::infrastructure::metrics::{record_connection, record_reconnect};
use crate::infrastructure::stream::codec::DecoderTable;
use crate::infrastructure::stream::context::{SharedState, StreamingContext};
use crate::infrastructure::stream::dispatcher::{DispatchError, DispatchOutcome, EventDispatcher};
use crate::infrastructure::stream::reconnect::ReconnectPolicy;

/// The streaming engine: connection lifecycle, dispatch, and reconnection.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use invest_stream::{
///     Registry, Streaming, StreamingConfig, Token, WsTransport,
/// };
/// use tokio_util::sync::CancellationToken;
///
/// async fn example() {
///     let config = StreamingConfig::new(Token::new("t.token").unwrap());
///     let mut handlers = Registry::new();
///     handlers.on_candle(|_ctx, candle| async move {
///         println!("{} {}", candle.figi, candle.close);
///         Ok(())
///     });
///
///     Streaming::new(config, Arc::new(WsTransport::new()), CancellationToken::new())
///         .add_handlers(handlers)
///         .run()
///         .await;
/// }
/// ```
pub struct Streaming {
    config: StreamingConfig,
    transport: Arc<dyn Transport>,
    registry: HandlerRegistry<StreamingContext>,
    decoders: DecoderTable,
    state: Arc<SharedState>,
    cancel: CancellationToken,
}

impl Streaming {
    /// Create an engine over a transport; no connection is made until
    /// [`Self::run`].
    #[must_use]
    pub fn new(
        config: StreamingConfig,
        transport: Arc<dyn Transport>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            transport,
            registry: HandlerRegistry::new(),
            decoders: DecoderTable::standard(),
            state: Arc::new(SharedState::default()),
            cancel,
        }
    }

    /// Merge a registry of handlers into the engine.
    ///
    /// Registrations are immutable once [`Self::run`] starts.
    #[must_use]
    pub fn add_handlers(mut self, handlers: HandlerRegistry<StreamingContext>) -> Self {
        self.registry.merge(handlers);
        self
    }

    /// Seed the shared state handlers address by key.
    #[must_use]
    pub fn with_state(mut self, entries: HashMap<String, serde_json::Value>) -> Self {
        self.state = Arc::new(SharedState::with_entries(entries));
        self
    }

    /// Replace the decoder table.
    #[must_use]
    pub fn with_decoders(mut self, decoders: DecoderTable) -> Self {
        self.decoders = decoders;
        self
    }

    /// Run until cancelled.
    ///
    /// Every completion of a connection attempt other than cancellation is
    /// logged and followed by a reconnect after the configured delay. The
    /// call only returns once the cancellation token fires; failures are
    /// visible to the caller through logs and through any `error`/`cleanup`
    /// handlers it registered.
    pub async fn run(self) {
        let Self {
            config,
            transport,
            registry,
            decoders,
            state,
            cancel,
        } = self;

        let dispatcher = EventDispatcher::new(Arc::new(registry), Arc::new(decoders));
        let options = config.connect_options();
        let mut policy = ReconnectPolicy::new(config.reconnect_timeout);

        loop {
            if cancel.is_cancelled() {
                tracing::info!("streaming cancelled");
                return;
            }

            match Self::connect_and_dispatch(&*transport, &options, &dispatcher, &state, &cancel)
                .await
            {
                Ok(DispatchOutcome::Cancelled) => {
                    tracing::info!("streaming cancelled");
                    return;
                }
                Ok(DispatchOutcome::Finished) => {
                    tracing::info!("connection closed");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "connection attempt failed");
                }
            }

            record_reconnect();
            let delay = policy.next_delay();
            tracing::info!(
                attempt = policy.attempt_count(),
                delay_ms = delay.as_millis(),
                "reconnecting"
            );

            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("streaming cancelled during reconnect delay");
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Open a fresh session and run one connection attempt on it.
    async fn connect_and_dispatch(
        transport: &dyn Transport,
        options: &ConnectOptions,
        dispatcher: &EventDispatcher,
        state: &Arc<SharedState>,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, DispatchError> {
        tracing::debug!(url = %options.url, "connecting");

        let session = tokio::select! {
            () = cancel.cancelled() => return Ok(DispatchOutcome::Cancelled),
            session = transport.connect(options) => session?,
        };
        record_connection();
        tracing::info!("connected");

        let ctx = StreamingContext::new(session.sender(), Arc::clone(state));
        dispatcher.run(session, ctx, cancel).await
    }
}

impl std::fmt::Debug for Streaming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Streaming")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
