//! Scripted fake transport for engine integration tests.
//!
//! Each connect attempt pops the next session script; a session replays its
//! steps as inbound frames, closes, errors, or hangs awaiting cancellation.
//! Attempts beyond the scripted list hang. Connect instants, outbound
//! frames, and close calls are recorded for assertions.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use invest_stream::{
    ConnectOptions, FrameSink, Session, StreamingConfig, Token, Transport, TransportError,
};

/// One scripted step of a fake session's inbound sequence.
pub enum Step {
    /// Yield a text frame.
    Frame(String),
    /// Sleep before the next step.
    Delay(Duration),
    /// Benign close.
    Close,
    /// Transport read failure.
    Error(String),
    /// Pend until the engine is cancelled.
    Hang,
}

/// Build a wire envelope step.
pub fn frame(event: &str, payload: serde_json::Value) -> Step {
    Step::Frame(serde_json::json!({"event": event, "payload": payload}).to_string())
}

/// A candle frame with plausible fields.
pub fn candle_frame(figi: &str) -> Step {
    frame(
        "candle",
        serde_json::json!({
            "o": 64.5, "c": 64.9, "h": 65.1, "l": 64.4, "v": 156,
            "time": "2019-08-07T15:35:00Z", "interval": "1min", "figi": figi
        }),
    )
}

/// Engine configuration used across tests: 3s reconnect delay, transport
/// timeouts left to the fake.
pub fn test_config() -> StreamingConfig {
    let mut config = StreamingConfig::new(Token::new("t.test").unwrap());
    config.url = "wss://stream.invalid/ws".to_string();
    config.reconnect_timeout = Duration::from_secs(3);
    config.receive_timeout = None;
    config.heartbeat = None;
    config
}

/// Poll a condition under the paused clock until it holds.
pub async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    for _ in 0..100_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached: {what}");
}

/// Transport whose sessions replay pre-recorded scripts.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Vec<Step>>>,
    connects: Mutex<Vec<Instant>>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    /// One inner vector per connection attempt, in order.
    pub fn new(scripts: Vec<Vec<Step>>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            ..Default::default()
        })
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().len()
    }

    pub fn connect_instants(&self) -> Vec<Instant> {
        self.connects.lock().clone()
    }

    pub fn sent_frames(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(
        &self,
        _options: &ConnectOptions,
    ) -> Result<Box<dyn Session>, TransportError> {
        self.connects.lock().push(Instant::now());
        let steps = self
            .scripts
            .lock()
            .pop_front()
            .unwrap_or_else(|| vec![Step::Hang]);
        Ok(Box::new(ScriptedSession {
            steps: steps.into(),
            sink: Arc::new(RecordingSink {
                sent: Arc::clone(&self.sent),
            }),
            closed: Arc::clone(&self.closed),
        }))
    }
}

/// Sink recording every outbound frame.
pub struct RecordingSink {
    sent: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl FrameSink for RecordingSink {
    async fn send(&self, frame: String) -> Result<(), TransportError> {
        self.sent.lock().push(frame);
        Ok(())
    }
}

struct ScriptedSession {
    steps: VecDeque<Step>,
    sink: Arc<RecordingSink>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl Session for ScriptedSession {
    fn sender(&self) -> Arc<dyn FrameSink> {
        Arc::clone(&self.sink) as Arc<dyn FrameSink>
    }

    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.steps.pop_front() {
                Some(Step::Frame(text)) => return Ok(Some(text)),
                Some(Step::Delay(delay)) => tokio::time::sleep(delay).await,
                Some(Step::Close) | None => return Ok(None),
                Some(Step::Error(message)) => return Err(TransportError::Recv(message)),
                Some(Step::Hang) => std::future::pending::<()>().await,
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
