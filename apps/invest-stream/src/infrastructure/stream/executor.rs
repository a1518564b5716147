//! Handler Executor
//!
//! Invokes a registered handler uniformly whatever its execution mode.
//! Async handlers run inline on the dispatch loop's runtime; blocking
//! handlers are offloaded to the runtime's blocking worker pool with the
//! current tracing span propagated, so slow user code never stalls the
//! loop's ability to read the next frame.
//!
//! `invoke` never fails synchronously: handler failures (including worker
//! panics) surface through the returned completion future, which the
//! dispatcher joins per frame.

use futures::future::BoxFuture;

use crate::domain::event::StreamEvent;
use crate::domain::registry::{Handler, HandlerResult};

/// Uniform invoker for async and blocking handlers.
#[derive(Debug, Default, Clone, Copy)]
pub struct HandlerExecutor;

impl HandlerExecutor {
    /// Create a new executor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Start a handler and return its completion.
    pub fn invoke<C: Clone + Send + 'static>(
        &self,
        handler: &Handler<C>,
        ctx: C,
        event: StreamEvent,
    ) -> BoxFuture<'static, HandlerResult> {
        match handler {
            Handler::Async(f) => f(ctx, event),
            Handler::Blocking(f) => {
                let f = std::sync::Arc::clone(f);
                let span = tracing::Span::current();
                Box::pin(async move {
                    match tokio::task::spawn_blocking(move || span.in_scope(|| f(ctx, event)))
                        .await
                    {
                        Ok(result) => result,
                        Err(join_error) => Err(anyhow::anyhow!(
                            "blocking handler aborted: {join_error}"
                        )),
                    }
                })
            }
        }
    }
}
