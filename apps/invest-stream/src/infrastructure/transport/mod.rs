//! WebSocket Transport
//!
//! `tokio-tungstenite` adapter for the [`Transport`] port. Connects with the
//! bearer token in the `Authorization` header, keeps the connection alive
//! with pings at the configured heartbeat interval, and bounds inbound
//! silence with the configured receive timeout.
//!
//! Ping, pong, and binary frames are handled here and never surface to the
//! engine; only text frames, closes, and errors do.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::application::ports::{ConnectOptions, FrameSink, Session, Transport, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket implementation of the [`Transport`] port.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsTransport;

impl WsTransport {
    /// Create a new transport.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, options: &ConnectOptions) -> Result<Box<dyn Session>, TransportError> {
        let mut request = options
            .url
            .as_str()
            .into_client_request()
            .map_err(|err| TransportError::Connect(err.to_string()))?;

        let bearer = format!("Bearer {}", options.token.secret());
        let header = HeaderValue::from_str(&bearer)
            .map_err(|err| TransportError::Connect(err.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, header);

        let (stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|err| TransportError::Connect(err.to_string()))?;

        let (write, read) = stream.split();

        let heartbeat = options.heartbeat.map(|period| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            interval
        });

        Ok(Box::new(WsSession {
            sender: Arc::new(WsSender {
                write: tokio::sync::Mutex::new(write),
            }),
            read,
            heartbeat,
            receive_timeout: options.receive_timeout,
            close_timeout: options.close_timeout,
        }))
    }
}

/// Shared outbound half of the socket.
///
/// The mutex makes each `send` call atomic at the frame boundary, which is
/// the write-atomicity the engine relies on for concurrent subscribe calls.
struct WsSender {
    write: tokio::sync::Mutex<SplitSink<WsStream, Message>>,
}

impl WsSender {
    async fn send_message(&self, message: Message) -> Result<(), tungstenite::Error> {
        self.write.lock().await.send(message).await
    }
}

#[async_trait]
impl FrameSink for WsSender {
    async fn send(&self, frame: String) -> Result<(), TransportError> {
        self.send_message(Message::Text(frame.into()))
            .await
            .map_err(|err| TransportError::Send(err.to_string()))
    }
}

/// One live WebSocket connection.
struct WsSession {
    sender: Arc<WsSender>,
    read: SplitStream<WsStream>,
    heartbeat: Option<tokio::time::Interval>,
    receive_timeout: Option<Duration>,
    close_timeout: Duration,
}

#[async_trait]
impl Session for WsSession {
    fn sender(&self) -> Arc<dyn FrameSink> {
        Arc::clone(&self.sender) as Arc<dyn FrameSink>
    }

    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            let message = tokio::select! {
                () = tick(&mut self.heartbeat) => {
                    self.sender
                        .send_message(Message::Ping(Vec::new().into()))
                        .await
                        .map_err(|err| TransportError::Send(err.to_string()))?;
                    continue;
                }
                message = next_message(&mut self.read, self.receive_timeout) => message?,
            };

            match message {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.to_string())),
                Some(Ok(Message::Ping(data))) => {
                    self.sender
                        .send_message(Message::Pong(data))
                        .await
                        .map_err(|err| TransportError::Send(err.to_string()))?;
                }
                Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Ok(_)) => {
                    // pong, binary, raw frames: keep-alive traffic only
                }
                Some(Err(
                    tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed,
                )) => return Ok(None),
                Some(Err(err)) => return Err(TransportError::Recv(err.to_string())),
                None => return Ok(None),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Err(err) = self.sender.send_message(Message::Close(None)).await {
            return match err {
                tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => Ok(()),
                other => Err(TransportError::Close(other.to_string())),
            };
        }

        if !self.close_timeout.is_zero() {
            // drain until the peer acknowledges the close or the timeout fires
            let _ = tokio::time::timeout(self.close_timeout, async {
                while let Some(message) = self.read.next().await {
                    if matches!(message, Ok(Message::Close(_)) | Err(_)) {
                        break;
                    }
                }
            })
            .await;
        }

        Ok(())
    }
}

async fn tick(heartbeat: &mut Option<tokio::time::Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn next_message(
    read: &mut SplitStream<WsStream>,
    receive_timeout: Option<Duration>,
) -> Result<Option<Result<Message, tungstenite::Error>>, TransportError> {
    match receive_timeout {
        Some(limit) => tokio::time::timeout(limit, read.next())
            .await
            .map_err(|_| TransportError::RecvTimeout(limit)),
        None => Ok(read.next().await),
    }
}
