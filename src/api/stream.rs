//! Transcription relay WebSocket endpoint
//!
//! Accepts raw binary audio chunks from the client and sends back finalized
//! transcripts as plain text frames. Each connection drives one
//! [`RelaySession`]; the upstream stream opens lazily on the first chunk.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

use super::ApiState;
use crate::relay::RelaySession;

/// Capacity of the session-scoped upstream events channel
const EVENT_BUFFER: usize = 64;

/// Build WebSocket router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new().route("/ws", get(ws_upgrade)).with_state(state)
}

/// Handle WebSocket upgrade request
async fn ws_upgrade(State(state): State<Arc<ApiState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one relay session over a client socket
///
/// The loop multiplexes three sources: client frames (binary chunks feed the
/// session, close ends it), upstream events (finals that survive the repeat
/// filter go back as text frames), and an idle timer that releases an open
/// upstream stream when no audio has arrived for the configured duration.
async fn handle_socket(socket: WebSocket, state: Arc<ApiState>) {
    let conn_id = uuid::Uuid::new_v4();
    tracing::info!(conn = %conn_id, "client connected");

    let (mut sender, mut receiver) = socket.split();

    let (events_tx, mut events_rx) = mpsc::channel(EVENT_BUFFER);
    let mut session = RelaySession::new(
        state.recognizer.clone(),
        state.recognizer_config.clone(),
        events_tx,
    );

    let idle = state.stream_idle_timeout;
    let mut deadline = Instant::now() + idle;

    loop {
        tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(Message::Binary(chunk))) => {
                    deadline = Instant::now() + idle;
                    if let Err(e) = session.push_chunk(chunk).await {
                        // The session already dropped the stale stream; the
                        // next chunk re-opens. The client stays connected.
                        tracing::warn!(conn = %conn_id, error = %e, "audio chunk not forwarded");
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                // Text, ping, and pong frames carry no audio
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(conn = %conn_id, error = %e, "client socket error");
                    break;
                }
            },
            Some(event) = events_rx.recv() => {
                if let Some(transcript) = session.apply_event(event) {
                    tracing::info!(conn = %conn_id, transcript = %transcript, "transcript emitted");
                    if sender.send(Message::Text(transcript.into())).await.is_err() {
                        break;
                    }
                }
            },
            () = sleep_until(deadline), if session.is_open() => {
                tracing::debug!(conn = %conn_id, "idle timeout, releasing recognition stream");
                session.finish_stream().await;
            }
        }
    }

    session.finish_stream().await;
    tracing::info!(conn = %conn_id, "client disconnected");
}
