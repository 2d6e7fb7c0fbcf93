//! WebSocket transport for the realtime protocol.
//!
//! Each socket gets an unbounded outbound channel drained by a forwarder
//! task; inbound frames are parsed and dispatched one at a time, so a
//! connection's commands are applied in the order it sent them.

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use caseroom_session::protocol::{ClientCommand, ServerEvent};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::coordinator;
use crate::state::AppState;

/// GET /ws
async fn upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| serve_socket(state, socket))
}

async fn serve_socket(state: AppState, socket: WebSocket) {
    let (mut outbound, mut inbound) = socket.split();
    let (sink, mut events) = mpsc::unbounded_channel::<ServerEvent>();
    let connection_id = coordinator::connection_opened(&state, sink);

    let forwarder = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    warn!(%connection_id, event = event.name(), error = %err, "failed to encode event");
                    continue;
                }
            };
            if outbound.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = inbound.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientCommand>(text.as_str()) {
                Ok(command) => coordinator::dispatch(&state, connection_id, command).await,
                Err(err) => coordinator::reject_malformed(&state, connection_id, &err.to_string()),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(%connection_id, error = %err, "socket read failed");
                break;
            }
        }
    }

    coordinator::connection_closed(&state, connection_id).await;
    forwarder.abort();
}

/// Returns the router for the realtime endpoint.
pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(upgrade))
}
