use crate::models::{MessageStatus, ParticipantId, SendIntent};
use crate::presence::ConnectionHandle;
use crate::state::AppState;
use crate::websocket::message_types::{ClientEvent, ServerEvent};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub participant_id: String,
}

/// GET /api/v1/ws?participant_id=..
///
/// Upgrades to the persistent bidirectional channel; presence registration
/// happens once the socket is open, removal when it closes.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let participant = ParticipantId::normalize(&params.participant_id);
    if participant.is_empty() {
        return StatusCode::BAD_REQUEST.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(state, participant, socket))
}

async fn handle_socket(state: AppState, participant: ParticipantId, socket: WebSocket) {
    let (handle, mut rx) = ConnectionHandle::new();

    // Last registration wins; the displaced connection is told explicitly
    // so its loop exits instead of lingering as a dangling send target.
    if let Some(displaced) = state
        .engine
        .presence()
        .register(participant.clone(), handle.clone())
    {
        displaced.send(ServerEvent::ConnectionReplaced);
        debug!(participant = %participant, "replaced existing connection");
    }
    debug!(participant = %participant, connection = %handle.connection_id(), "registered");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            // Engine push path: presence handle -> this socket.
            maybe_event = rx.recv() => {
                let Some(event) = maybe_event else { break };
                let replaced = matches!(event, ServerEvent::ConnectionReplaced);
                match serde_json::to_string(&event) {
                    Ok(text) => {
                        if sender.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "failed to serialize server event"),
                }
                if replaced {
                    break;
                }
            }

            // Client path: inbound frames.
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_event(&state, &participant, &handle, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong handled by the framework
                    Some(Err(e)) => {
                        debug!(participant = %participant, error = %e, "socket error");
                        break;
                    }
                }
            }
        }
    }

    state.engine.presence().unregister(&handle);
    debug!(participant = %participant, "unregistered");
}

/// Dispatch one inbound frame. Malformed frames are logged and dropped;
/// engine failures are answered with a negative ack, never a fault on the
/// channel.
async fn handle_client_event(
    state: &AppState,
    participant: &ParticipantId,
    handle: &ConnectionHandle,
    text: &str,
) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(participant = %participant, error = %e, "unparseable client event");
            return;
        }
    };

    match event {
        ClientEvent::Send {
            client_correlation_id,
            recipient_id,
            body,
        } => {
            let intent = SendIntent {
                client_correlation_id: client_correlation_id.clone(),
                sender_id: participant.as_str().to_string(),
                recipient_id,
                body,
            };
            match state.engine.submit_message(intent).await {
                Ok(receipt) => {
                    handle.send(ServerEvent::SendAck {
                        message_id: Some(receipt.message_id),
                        delivered: receipt.delivered,
                        duplicate: receipt.duplicate,
                    });
                }
                Err(e) => {
                    warn!(participant = %participant, error = %e, "send failed");
                    handle.send(ServerEvent::SendAck {
                        message_id: client_correlation_id,
                        delivered: false,
                        duplicate: false,
                    });
                }
            }
        }
        ClientEvent::MarkRead { message_id, status } => {
            // Clients only confirm receipt; anything else on this path is a
            // protocol misuse and ignored.
            if !matches!(status, MessageStatus::Delivered | MessageStatus::Read) {
                warn!(participant = %participant, %status, "ignoring mark_read with invalid status");
                return;
            }
            if let Err(e) = state.engine.update_delivery_status(&message_id, status).await {
                warn!(participant = %participant, error = %e, "status update failed");
            }
        }
    }
}
