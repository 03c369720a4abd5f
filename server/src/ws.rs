//! The duplex channel endpoint.
//!
//! Clients attach at `/ws?sessionId=<token>`. A missing token closes the
//! channel with 4001, an invalid or expired one with 4002. Once attached,
//! the server pushes `{type, data, timestamp}` events through a dedicated
//! writer task; the only message read from the client is `{type: "ping"}`,
//! answered with `pong` and counted as liveness for the heartbeat sweep.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use log::debug;
use serde::Deserialize;

use shared::{ClientMessage, ServerEvent};

use crate::sessions;
use crate::state::SharedState;
use crate::tasks;

/// Close code: no session token in the query string.
pub const CLOSE_MISSING_TOKEN: u16 = 4001;

/// Close code: token did not resolve to a live session.
pub const CLOSE_INVALID_TOKEN: u16 = 4002;

#[derive(Deserialize)]
pub struct WsQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

pub async fn ws_handler(
    State(state): State<SharedState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, socket, query.session_id))
}

async fn handle_socket(state: SharedState, socket: WebSocket, token: Option<String>) {
    let Some(token) = token else {
        reject(socket, CLOSE_MISSING_TOKEN, "missing session token").await;
        return;
    };
    let auth = {
        let mut st = state.lock().await;
        sessions::authenticate(&mut st, &token)
    };
    let player_id = match auth {
        Ok(ctx) => ctx.player_id,
        Err(_) => {
            reject(socket, CLOSE_INVALID_TOKEN, "invalid or expired session token").await;
            return;
        }
    };

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Attaching cancels any pending disconnect removal (this is a
    // reconnection, not a new identity) and replaces a previous channel.
    let (conn_id, mut outbox) = {
        let mut st = state.lock().await;
        let attached = st.connections.attach(player_id);
        st.connections
            .send(player_id, &ServerEvent::Connected { player_id });
        attached
    };

    // Writer task owns the sink; it drains the outbox and closes the socket
    // once the channel is dropped from the connection map.
    let writer = tokio::spawn(async move {
        while let Some(text) = outbox.recv().await {
            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.send(Message::Close(None)).await;
    });

    // Read loop: heartbeat only. State changes arrive over the request
    // surface, never the channel.
    while let Some(Ok(message)) = ws_rx.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Ping) => {
                    let mut st = state.lock().await;
                    st.connections.mark_alive(player_id, conn_id);
                    st.connections.send(player_id, &ServerEvent::Pong);
                }
                Err(err) => {
                    debug!("ignoring unknown channel message from {player_id}: {err}");
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    // The channel closed. Start the reconnect grace window unless a newer
    // channel already took over this player.
    let generation = {
        let mut st = state.lock().await;
        if st.connections.detach(player_id, conn_id) {
            Some(st.connections.begin_grace(player_id))
        } else {
            None
        }
    };
    if let Some(generation) = generation {
        tasks::spawn_disconnect_grace(state.clone(), player_id, generation);
    }
    let _ = writer.await;
}

async fn reject(mut socket: WebSocket, code: u16, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await;
}
