use crate::payload::parse_payload;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use relaybot_core::{BrokerAdapter, Direction, RelayError, Signal};
use std::sync::Arc;
use tracing::{error, info, warn};

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ---------------------------------------------------------------------------
// Webhook
// ---------------------------------------------------------------------------

/// The webhook endpoint.
///
/// Acknowledges with 200 immediately; the broker round trips run in a
/// spawned task and their failures are observable only in the log stream.
pub async fn webhook(State(state): State<Arc<AppState>>, body: String) -> impl IntoResponse {
    let signal = match parse_payload(&body) {
        Ok(signal) => signal,
        Err(e) => {
            warn!(error = %e, "Rejected webhook payload");
            return Json(serde_json::json!({ "status": "ignored" }));
        }
    };

    info!(
        symbol = %signal.symbol,
        direction = %signal.raw_direction,
        broker = %signal.broker_code,
        "Received webhook signal"
    );

    let broker = match state.registry.get(&signal.broker_code) {
        Ok(broker) => broker,
        Err(e) => {
            error!(
                error = %e,
                symbol = %signal.symbol,
                direction = %signal.raw_direction,
                "No broker for signal"
            );
            return Json(serde_json::json!({ "status": "ignored" }));
        }
    };

    let state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = dispatch(&state, broker, &signal).await {
            error!(
                error = %e,
                symbol = %signal.symbol,
                direction = %signal.raw_direction,
                broker = %signal.broker_code,
                "Signal dispatch failed"
            );
        }
    });

    Json(serde_json::json!({ "status": "ok" }))
}

/// Route a parsed signal to its broker adapter.
///
/// The per-symbol lock is held across the whole close-then-open sequence.
pub async fn dispatch(
    state: &AppState,
    broker: Arc<dyn BrokerAdapter>,
    signal: &Signal,
) -> Result<(), RelayError> {
    let Some(direction) = signal.direction else {
        // Unrecognized direction tokens are dropped, not failed.
        warn!(
            symbol = %signal.symbol,
            direction = %signal.raw_direction,
            "Ignoring signal with unknown direction"
        );
        return Ok(());
    };

    let lock = state.symbol_lock(&signal.broker_code, &signal.symbol).await;
    let _guard = lock.lock().await;

    match direction {
        Direction::Buy => broker.open_long(&signal.symbol, signal.quantity).await,
        Direction::Sell => broker.open_short(&signal.symbol, signal.quantity).await,
    }
}
