use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub mod conversations;
pub mod messages;

use crate::websocket::handlers::ws_handler;
use conversations::{list_conversations, list_participants};
use messages::{get_message_history, send_message, update_message_status};

pub fn build_router() -> Router<AppState> {
    let introspection = Router::new().route("/health", get(|| async { "OK" }));

    let api_v1 = Router::new()
        .route("/conversations", get(list_conversations))
        .route("/participants", get(list_participants))
        .route("/messages", post(send_message))
        .route("/messages/:a/:b", get(get_message_history))
        .route("/messages/:id/status", post(update_message_status))
        .route("/ws", get(ws_handler));

    introspection.merge(Router::new().nest("/api/v1", api_v1))
}
