//! Streaming Engine
//!
//! The per-connection dispatch loop and the outer reconnect loop, together
//! with everything a connection attempt needs: the frame codec, the handler
//! executor, the subscription builders, and the context handed to handlers.
//!
//! # Lifecycle
//!
//! [`Streaming::run`] owns the outer loop: connect, hand the fresh session
//! to the [`EventDispatcher`], and on anything but cancellation wait the
//! fixed reconnect delay and connect again. One connection attempt runs
//! startup hooks, reads frames strictly in arrival order (handlers for one
//! frame all settle before the next frame is read), and runs cleanup hooks
//! on every exit path.

mod codec;
mod context;
mod dispatcher;
mod executor;
mod reconnect;
mod runner;
mod subscribe;

pub use codec::{parse_frame, CodecError, DecoderTable};
pub use context::{SharedState, StateError, StreamingContext};
pub use dispatcher::{DispatchError, DispatchOutcome, EventDispatcher};
pub use executor::HandlerExecutor;
pub use reconnect::ReconnectPolicy;
pub use runner::Streaming;
pub use subscribe::{
    CandleSubscription, InstrumentInfoSubscription, OrderbookSubscription, SubscribeError,
    ValidationError,
};

use crate::domain::registry::HandlerRegistry;

/// Handler registry bound to the engine's [`StreamingContext`].
pub type Registry = HandlerRegistry<StreamingContext>;
