//! Event Dispatcher
//!
//! The per-connection run loop. Given a fresh session it runs the startup
//! hooks, consumes inbound frames, decodes payloads, fans each decoded event
//! out to the matching handlers, and runs the cleanup hooks on the way out.
//!
//! # Ordering
//!
//! Frames are processed strictly in arrival order: all handlers dispatched
//! for one frame settle before the next frame is read. Handlers for the same
//! frame race each other freely.
//!
//! # Exit Paths
//!
//! The loop exits on a benign close, a transport error, a decode failure, a
//! handler failure, or cancellation. Cleanup hooks run exactly once on every
//! one of those paths, then the session is closed.

use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{Session, TransportError};
use crate::domain::event::{EventKind, StreamEvent};
use crate::domain::registry::HandlerRegistry;
use crate::infrastructure::metrics::{record_frame, record_handler_error};
use crate::infrastructure::stream::codec::{parse_frame, CodecError, DecoderTable};
use crate::infrastructure::stream::context::StreamingContext;
use crate::infrastructure::stream::executor::HandlerExecutor;

/// How a connection attempt ended, short of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Benign completion (server close or end of stream); the caller may
    /// connect again.
    Finished,
    /// Cancellation was observed; the caller must not connect again.
    Cancelled,
}

/// Failure of one connection attempt.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The transport failed while connecting, reading, or writing.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An inbound frame could not be parsed or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A startup hook failed; the attempt never reached the read loop.
    #[error("startup handler failed: {0}")]
    Startup(#[source] anyhow::Error),

    /// A handler failed during fan-out; the attempt ends after the frame's
    /// remaining handlers settle.
    #[error("handler failed: {0}")]
    Handler(#[source] anyhow::Error),
}

/// Per-connection run loop over a handler registry and decoder table.
pub struct EventDispatcher {
    registry: Arc<HandlerRegistry<StreamingContext>>,
    decoders: Arc<DecoderTable>,
    executor: HandlerExecutor,
}

impl EventDispatcher {
    /// Create a dispatcher over an immutable registry and decoder table.
    #[must_use]
    pub fn new(
        registry: Arc<HandlerRegistry<StreamingContext>>,
        decoders: Arc<DecoderTable>,
    ) -> Self {
        Self {
            registry,
            decoders,
            executor: HandlerExecutor::new(),
        }
    }

    /// Run one connection attempt to completion.
    ///
    /// Cleanup hooks run and the session is closed on every exit path.
    ///
    /// # Errors
    ///
    /// Returns the failure that ended the attempt; the caller decides
    /// whether to reconnect.
    pub async fn run(
        &self,
        mut session: Box<dyn Session>,
        ctx: StreamingContext,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, DispatchError> {
        let outcome = match self.startup(&ctx).await {
            Ok(()) => self.read_loop(session.as_mut(), &ctx, cancel).await,
            Err(err) => Err(err),
        };

        self.drain(&ctx).await;
        if let Err(err) = session.close().await {
            tracing::warn!(error = %err, "session close failed");
        }

        outcome
    }

    /// Run all startup hooks concurrently and wait for them to settle.
    async fn startup(&self, ctx: &StreamingContext) -> Result<(), DispatchError> {
        let completions: Vec<_> = self
            .registry
            .lookup(&EventKind::Startup)
            .map(|handler| {
                self.executor.invoke(
                    handler,
                    ctx.clone(),
                    StreamEvent::lifecycle(EventKind::Startup),
                )
            })
            .collect();

        let mut first_error = None;
        for result in join_all(completions).await {
            if let Err(err) = result {
                tracing::error!(error = %err, "startup handler failed");
                first_error.get_or_insert(err);
            }
        }

        first_error.map_or(Ok(()), |err| Err(DispatchError::Startup(err)))
    }

    /// Consume inbound frames until close, error, or cancellation.
    async fn read_loop(
        &self,
        session: &mut dyn Session,
        ctx: &StreamingContext,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, DispatchError> {
        loop {
            let next = tokio::select! {
                () = cancel.cancelled() => return Ok(DispatchOutcome::Cancelled),
                next = session.recv() => next,
            };

            match next {
                Ok(Some(text)) => self.dispatch_frame(&text, ctx).await?,
                Ok(None) => return Ok(DispatchOutcome::Finished),
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Decode one frame and fan it out; returns once every handler settled.
    async fn dispatch_frame(&self, text: &str, ctx: &StreamingContext) -> Result<(), DispatchError> {
        let frame = parse_frame(text)?;
        let kind = EventKind::from_wire(&frame.event);
        record_frame(&kind);

        let payload = self.decoders.decode(&kind, frame.payload)?;
        let event = StreamEvent {
            kind: kind.clone(),
            payload,
        };

        let completions: Vec<_> = self
            .registry
            .lookup(&kind)
            .map(|handler| self.executor.invoke(handler, ctx.clone(), event.clone()))
            .collect();
        if completions.is_empty() {
            return Ok(());
        }

        let mut first_error = None;
        for result in join_all(completions).await {
            if let Err(err) = result {
                tracing::warn!(kind = %kind, error = %err, "handler failed");
                record_handler_error(&kind);
                first_error.get_or_insert(err);
            }
        }

        first_error.map_or(Ok(()), |err| Err(DispatchError::Handler(err)))
    }

    /// Run all cleanup hooks; failures are logged, never escalated.
    async fn drain(&self, ctx: &StreamingContext) {
        let completions: Vec<_> = self
            .registry
            .lookup(&EventKind::Cleanup)
            .map(|handler| {
                self.executor.invoke(
                    handler,
                    ctx.clone(),
                    StreamEvent::lifecycle(EventKind::Cleanup),
                )
            })
            .collect();

        for result in join_all(completions).await {
            if let Err(err) = result {
                tracing::warn!(error = %err, "cleanup handler failed");
            }
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
