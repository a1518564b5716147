//! Handler Registration
//!
//! An append-only, ordered collection of `(kind, handler)` pairs. The
//! registry is kind-agnostic storage: parameter validation belongs to the
//! typed subscribe builders, and lifecycle pseudo-kinds (`startup`,
//! `cleanup`) are stored exactly like data kinds.
//!
//! Registration order is preserved so that fan-out order is deterministic.
//! There is no removal and no duplicate suppression: registering the same
//! handler twice under the same kind invokes it twice per matching event.
//!
//! # Execution Mode
//!
//! Every handler is tagged at registration time as [`Handler::Async`] or
//! [`Handler::Blocking`]; the tag is resolved once and never re-evaluated.
//! Async handlers run on the dispatch loop's runtime and must not block;
//! blocking handlers are offloaded to the runtime's worker pool.
//!
//! The registry is generic over the context type `C` handed to handlers,
//! which keeps this module free of any transport dependency.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::domain::event::{
    CandlePayload, ErrorPayload, EventKind, EventPayload, InstrumentInfoPayload, OrderbookPayload,
    StreamEvent,
};

/// Completion type shared by every handler.
pub type HandlerResult = anyhow::Result<()>;

/// Boxed async handler callable.
pub type AsyncHandlerFn<C> =
    dyn Fn(C, StreamEvent) -> BoxFuture<'static, HandlerResult> + Send + Sync;

/// Boxed blocking handler callable.
pub type BlockingHandlerFn<C> = dyn Fn(C, StreamEvent) -> HandlerResult + Send + Sync;

/// A registered callable, tagged with its execution mode.
pub enum Handler<C> {
    /// Runs inline on the dispatch loop's runtime; may suspend freely.
    Async(Arc<AsyncHandlerFn<C>>),
    /// Runs on the blocking worker pool; may block freely.
    Blocking(Arc<BlockingHandlerFn<C>>),
}

impl<C> Clone for Handler<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Async(f) => Self::Async(Arc::clone(f)),
            Self::Blocking(f) => Self::Blocking(Arc::clone(f)),
        }
    }
}

impl<C> std::fmt::Debug for Handler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Async(_) => f.write_str("Handler::Async"),
            Self::Blocking(_) => f.write_str("Handler::Blocking"),
        }
    }
}

impl<C> Handler<C> {
    /// Wrap an async callable.
    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: Fn(C, StreamEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::Async(Arc::new(
            move |ctx, event| -> BoxFuture<'static, HandlerResult> { Box::pin(f(ctx, event)) },
        ))
    }

    /// Wrap a blocking callable.
    pub fn blocking<F>(f: F) -> Self
    where
        F: Fn(C, StreamEvent) -> HandlerResult + Send + Sync + 'static,
    {
        Self::Blocking(Arc::new(f))
    }
}

/// Ordered collection of `(kind, handler)` registrations.
pub struct HandlerRegistry<C> {
    entries: Vec<(EventKind, Handler<C>)>,
}

impl<C> Default for HandlerRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> HandlerRegistry<C> {
    /// Create an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a handler under a kind.
    pub fn register(&mut self, kind: EventKind, handler: Handler<C>) -> &mut Self {
        self.entries.push((kind, handler));
        self
    }

    /// Append all of another registry's entries, preserving relative order.
    pub fn merge(&mut self, other: Self) -> &mut Self {
        self.entries.extend(other.entries);
        self
    }

    /// All handlers registered under `kind`, in registration order.
    pub fn lookup<'a>(&'a self, kind: &'a EventKind) -> impl Iterator<Item = &'a Handler<C>> {
        self.entries
            .iter()
            .filter(move |(k, _)| k == kind)
            .map(|(_, h)| h)
    }

    /// Total number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry holds no registrations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C: Clone + Send + 'static> HandlerRegistry<C> {
    /// Register an async handler under an explicit kind.
    ///
    /// The handler receives the full [`StreamEvent`]; the typed `on_*`
    /// methods below are sugar over this for the closed kind set.
    pub fn on_event<F, Fut>(&mut self, kind: EventKind, f: F) -> &mut Self
    where
        F: Fn(C, StreamEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(kind, Handler::asynchronous(f))
    }

    /// Register a startup hook, run once per connection attempt before any
    /// frame is read.
    pub fn on_startup<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(
            EventKind::Startup,
            Handler::asynchronous(move |ctx, _event| f(ctx)),
        )
    }

    /// Register a cleanup hook, run once per connection attempt on every
    /// exit path.
    pub fn on_cleanup<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(
            EventKind::Cleanup,
            Handler::asynchronous(move |ctx, _event| f(ctx)),
        )
    }

    /// Register a handler for decoded candle events.
    pub fn on_candle<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(C, CandlePayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(
            EventKind::Candle,
            Handler::asynchronous(move |ctx, event| {
                let payload = match event.payload {
                    EventPayload::Candle(candle) => Some(candle),
                    _ => None,
                };
                let fut = payload.map(|candle| f(ctx, candle));
                async move {
                    match fut {
                        Some(fut) => fut.await,
                        None => Ok(()),
                    }
                }
            }),
        )
    }

    /// Register a handler for decoded order book events.
    pub fn on_orderbook<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(C, OrderbookPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(
            EventKind::Orderbook,
            Handler::asynchronous(move |ctx, event| {
                let fut = match event.payload {
                    EventPayload::Orderbook(book) => Some(f(ctx, book)),
                    _ => None,
                };
                async move {
                    match fut {
                        Some(fut) => fut.await,
                        None => Ok(()),
                    }
                }
            }),
        )
    }

    /// Register a handler for decoded instrument status events.
    pub fn on_instrument_info<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(C, InstrumentInfoPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(
            EventKind::InstrumentInfo,
            Handler::asynchronous(move |ctx, event| {
                let fut = match event.payload {
                    EventPayload::InstrumentInfo(info) => Some(f(ctx, info)),
                    _ => None,
                };
                async move {
                    match fut {
                        Some(fut) => fut.await,
                        None => Ok(()),
                    }
                }
            }),
        )
    }

    /// Register a handler for server-reported errors.
    pub fn on_error<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(C, ErrorPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(
            EventKind::Error,
            Handler::asynchronous(move |ctx, event| {
                let fut = match event.payload {
                    EventPayload::Error(err) => Some(f(ctx, err)),
                    _ => None,
                };
                async move {
                    match fut {
                        Some(fut) => fut.await,
                        None => Ok(()),
                    }
                }
            }),
        )
    }
}

impl<C> std::fmt::Debug for HandlerRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Handler<()> {
        Handler::asynchronous(|(), _event| async { Ok(()) })
    }

    #[test]
    fn lookup_filters_by_exact_kind() {
        let mut registry: HandlerRegistry<()> = HandlerRegistry::new();
        registry.register(EventKind::Candle, noop());
        registry.register(EventKind::Orderbook, noop());
        registry.register(EventKind::Candle, noop());

        assert_eq!(registry.lookup(&EventKind::Candle).count(), 2);
        assert_eq!(registry.lookup(&EventKind::Orderbook).count(), 1);
        assert_eq!(registry.lookup(&EventKind::InstrumentInfo).count(), 0);
    }

    #[test]
    fn other_kinds_match_exactly() {
        let mut registry: HandlerRegistry<()> = HandlerRegistry::new();
        registry.register(EventKind::Other("pong".to_string()), noop());

        assert_eq!(
            registry.lookup(&EventKind::Other("pong".to_string())).count(),
            1
        );
        assert_eq!(
            registry.lookup(&EventKind::Other("ping".to_string())).count(),
            0
        );
    }

    #[test]
    fn duplicate_registration_is_kept() {
        let mut registry: HandlerRegistry<()> = HandlerRegistry::new();
        let handler = noop();
        registry.register(EventKind::Candle, handler.clone());
        registry.register(EventKind::Candle, handler);

        assert_eq!(registry.lookup(&EventKind::Candle).count(), 2);
    }

    #[test]
    fn merge_preserves_relative_order() {
        let mut first: HandlerRegistry<()> = HandlerRegistry::new();
        first.register(EventKind::Candle, noop());
        first.register(EventKind::Cleanup, noop());

        let mut second: HandlerRegistry<()> = HandlerRegistry::new();
        second.register(EventKind::Candle, Handler::blocking(|(), _event| Ok(())));

        first.merge(second);

        assert_eq!(first.len(), 3);
        let modes: Vec<bool> = first
            .lookup(&EventKind::Candle)
            .map(|h| matches!(h, Handler::Async(_)))
            .collect();
        // the async handler registered first stays first
        assert_eq!(modes, vec![true, false]);
    }

    #[tokio::test]
    async fn typed_registration_extracts_payload() {
        let mut registry: HandlerRegistry<()> = HandlerRegistry::new();
        registry.on_candle(|(), candle| async move {
            assert_eq!(candle.figi, "BBG0013HGFT4");
            Ok(())
        });

        let candle: CandlePayload = serde_json::from_str(
            r#"{"o":1,"c":1,"h":1,"l":1,"v":1,
                "time":"2019-08-07T15:35:00Z","interval":"1min","figi":"BBG0013HGFT4"}"#,
        )
        .unwrap();
        let event = StreamEvent {
            kind: EventKind::Candle,
            payload: EventPayload::Candle(candle),
        };

        let handler = registry.lookup(&EventKind::Candle).next().unwrap();
        match handler {
            Handler::Async(f) => f((), event).await.unwrap(),
            Handler::Blocking(_) => unreachable!(),
        }
    }
}
