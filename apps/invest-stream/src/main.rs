//! Invest Stream Binary
//!
//! Connects to the streaming API, subscribes to the configured instruments,
//! and logs every event until interrupted.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin invest-stream
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `INVEST_TOKEN`: OpenAPI bearer token
//!
//! ## Optional
//! - `INVEST_WATCH_FIGIS`: comma-separated instruments to subscribe to
//! - `INVEST_CANDLE_INTERVAL`: candle interval (default: 1min)
//! - `INVEST_ORDERBOOK_DEPTH`: order book depth (default: 2)
//! - `INVEST_STREAM_URL`: endpoint override
//! - `INVEST_RECONNECT_TIMEOUT_MS`: delay between reconnects (default: 3000)
//! - `INVEST_RECEIVE_TIMEOUT_MS`: inbound silence bound, 0 disables (default: 5000)
//! - `INVEST_HEARTBEAT_MS`: ping interval, 0 disables (default: 3000)
//! - `INVEST_CLOSE_TIMEOUT_MS`: close handshake wait (default: 0)
//! - `RUST_LOG`: log level (default: info)

use std::sync::Arc;

use invest_stream::infrastructure::{metrics, telemetry};
use invest_stream::{
    Registry, Streaming, StreamingConfig, StreamingContext, WatchSettings, WsTransport,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let _ = dotenvy::dotenv();

    telemetry::init();
    metrics::describe();

    tracing::info!("Starting invest-stream");

    let config = StreamingConfig::from_env()?;
    let watch = WatchSettings::from_env();
    log_config(&config, &watch);

    let shutdown_token = CancellationToken::new();

    let streaming = Streaming::new(
        config,
        Arc::new(WsTransport::new()),
        shutdown_token.clone(),
    )
    .add_handlers(build_handlers(watch));

    let runner = tokio::spawn(streaming.run());

    await_shutdown(shutdown_token).await;

    runner.await?;
    tracing::info!("invest-stream stopped");
    Ok(())
}

/// Register the subscription hook and the logging handlers.
fn build_handlers(watch: WatchSettings) -> Registry {
    let mut handlers = Registry::new();

    handlers.on_startup(move |ctx: StreamingContext| {
        let watch = watch.clone();
        async move {
            for figi in &watch.figis {
                let request_id = uuid::Uuid::new_v4().to_string();
                ctx.candle()
                    .subscribe(figi, &watch.candle_interval, Some(request_id.as_str()))
                    .await?;

                let request_id = uuid::Uuid::new_v4().to_string();
                ctx.orderbook()
                    .subscribe(figi, watch.orderbook_depth, Some(request_id.as_str()))
                    .await?;

                let request_id = uuid::Uuid::new_v4().to_string();
                ctx.instrument_info()
                    .subscribe(figi, Some(request_id.as_str()))
                    .await?;
            }
            tracing::info!(instruments = watch.figis.len(), "subscriptions issued");
            Ok(())
        }
    });

    handlers.on_candle(|_ctx, candle| async move {
        tracing::info!(
            figi = %candle.figi,
            interval = %candle.interval,
            open = %candle.open,
            close = %candle.close,
            high = %candle.high,
            low = %candle.low,
            volume = candle.volume,
            "candle"
        );
        Ok(())
    });

    handlers.on_orderbook(|_ctx, book| async move {
        tracing::info!(
            figi = %book.figi,
            depth = book.depth,
            bids = book.bids.len(),
            asks = book.asks.len(),
            "orderbook"
        );
        Ok(())
    });

    handlers.on_instrument_info(|_ctx, info| async move {
        tracing::info!(
            figi = %info.figi,
            status = %info.trade_status,
            "instrument info"
        );
        Ok(())
    });

    handlers.on_error(|_ctx, err| async move {
        tracing::error!(
            error = %err.error,
            request_id = ?err.request_id,
            "server error"
        );
        Ok(())
    });

    handlers.on_cleanup(|_ctx| async move {
        tracing::debug!("connection drained");
        Ok(())
    });

    handlers
}

/// Log the parsed configuration.
fn log_config(config: &StreamingConfig, watch: &WatchSettings) {
    tracing::info!(
        url = %config.url,
        reconnect_ms = config.reconnect_timeout.as_millis(),
        instruments = watch.figis.len(),
        candle_interval = %watch.candle_interval,
        orderbook_depth = watch.orderbook_depth,
        "Configuration loaded"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
