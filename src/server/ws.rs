//! `GET /ws/transcribe-stream` handler.
//!
//! One connection, one [`Controller`], one task. Unlike a duplex media
//! relay, a CTE connection never needs independent send/receive tasks: every
//! inbound frame produces at most one reply and processing is strictly
//! sequential (§5), so a single loop alternating receive → handle → send is
//! both correct and simpler than splitting the socket.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::server::AppState;
use crate::session::Controller;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    session_id: Option<String>,
}

pub async fn transcribe_stream(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params.session_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, requested_session_id: Option<String>) {
    let (mut sender, mut receiver) = socket.split();

    let session_id = state.registry.register(requested_session_id).await;
    let (mut controller, connected) = Controller::new(
        session_id.clone(),
        &state.config,
        state.asr.clone(),
        state.hiragana.clone(),
        state.translator.clone(),
        state.worker_pool.clone(),
    );

    if sender.send(Message::Text(connected.to_json())).await.is_err() {
        state.registry.remove(&session_id).await;
        return;
    }

    info!(session_id = %session_id, "transcription session opened");

    while let Some(frame) = receiver.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                warn!(session_id = %session_id, error = %err, "websocket error, closing session");
                break;
            }
        };

        let reply = match frame {
            Message::Binary(data) => Some(controller.handle_binary(&data).await),
            Message::Text(text) => handle_text_frame(&mut controller, &text, &session_id).await,
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => None,
        };

        state.registry.touch(&session_id).await;

        if let Some(reply) = reply {
            if sender.send(Message::Text(reply.to_json())).await.is_err() {
                break;
            }
        }

        if controller.is_closed() {
            break;
        }
    }

    // `* -> Closed` on bare transport close/timeout is distinct from the
    // client-initiated `end` control message (§4.8): it does not run a
    // finalize ASR pass, it just stops driving the session.
    controller.mark_closed();

    state.registry.remove(&session_id).await;
    info!(session_id = %session_id, "transcription session closed");
}

/// Recognized `type` tags, kept in sync with [`ClientMessage`]'s variants.
const KNOWN_MESSAGE_TYPES: &[&str] = &["options", "end", "ping"];

/// Parse and dispatch one text-channel frame.
///
/// §4.8 draws a line between two failure modes that `serde_json` collapses
/// into a single `Err`: a `type` tag the server doesn't recognize is ignored
/// silently, but JSON that is outright invalid, or that names a known type
/// with a malformed payload, is a protocol error and gets an `error` event
/// back (§7) without closing the session.
async fn handle_text_frame(controller: &mut Controller, text: &str, session_id: &str) -> Option<ServerMessage> {
    let parse_err = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => return controller.handle_control(message).await,
        Err(err) => err,
    };

    // Valid JSON with an unrecognized `type` is ignored per §4.8; anything
    // else (broken JSON, or a known type with a malformed payload) is a
    // protocol error reported back to the client per §7.
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
        if !has_known_type(&value) {
            debug!(session_id = %session_id, "ignoring unrecognized control message");
            return None;
        }
    }

    debug!(session_id = %session_id, error = %parse_err, "malformed control message");
    Some(ServerMessage::Error { message: format!("malformed control message: {parse_err}") })
}

fn has_known_type(value: &serde_json::Value) -> bool {
    value.get("type").and_then(|t| t.as_str()).is_some_and(|ty| KNOWN_MESSAGE_TYPES.contains(&ty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asr::MockAsrInvoker;
    use crate::config::Config;
    use crate::text::{HiraganaNormalizer, NoopTranslator};
    use crate::worker_pool::WorkerPool;
    use std::sync::Arc;

    fn make_controller() -> Controller {
        let config = Config::default();
        let (controller, _connected) = Controller::new(
            "s1".to_string(),
            &config,
            Arc::new(MockAsrInvoker { fixed_text: "こんにちは。".to_string() }),
            Arc::new(HiraganaNormalizer::new()),
            Arc::new(NoopTranslator),
            Arc::new(WorkerPool::new(2)),
        );
        controller
    }

    #[tokio::test]
    async fn invalid_json_yields_error_event() {
        let mut controller = make_controller();
        let reply = handle_text_frame(&mut controller, "not json at all", "s1").await;
        assert!(matches!(reply, Some(ServerMessage::Error { .. })));
        assert!(!controller.is_closed());
    }

    #[tokio::test]
    async fn known_type_with_bad_payload_yields_error_event() {
        let mut controller = make_controller();
        let reply = handle_text_frame(&mut controller, r#"{"type":"options","hiragana":"yes"}"#, "s1").await;
        assert!(matches!(reply, Some(ServerMessage::Error { .. })));
        assert!(!controller.is_closed());
    }

    #[tokio::test]
    async fn unrecognized_type_is_ignored() {
        let mut controller = make_controller();
        let reply = handle_text_frame(&mut controller, r#"{"type":"subscribe_to_something"}"#, "s1").await;
        assert!(reply.is_none());
        assert!(!controller.is_closed());
    }

    #[tokio::test]
    async fn recognized_message_dispatches_normally() {
        let mut controller = make_controller();
        let reply = handle_text_frame(&mut controller, r#"{"type":"ping"}"#, "s1").await;
        assert!(matches!(reply, Some(ServerMessage::Pong)));
    }
}
