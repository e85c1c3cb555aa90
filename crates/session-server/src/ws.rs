//! WebSocket endpoint for the browser board.
//!
//! A connection plays one game at a time. The client sends `start` to open
//! a session bound to the connection, then one `next_move` per ply: with
//! both squares for a move made on the board, or with empty squares to ask
//! the server's automated mover.
//!
//! ```text
//! -> {"message": "start", "options": {"white_player": "human", "black_player": "ai"}, "board_state": ""}
//! <- {"message": "started", "id": "...", "board_state": "rnbqkbnr/... w KQkq - 0 1"}
//! -> {"message": "next_move", "move": {"from": "e2", "to": "e4"}}
//! <- {"message": "next_move_received", "move": {"from": "e2", "to": "e4"}, "comment": "", "board_state": "..."}
//! ```
//!
//! Sessions outlive their connection and stay reachable through the REST
//! API.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use chess_session::{Outcome, StrategyFactory};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::sessions::{play, Squares, StartRequest};
use crate::AppState;

/// Player choices of the `start` message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerOptions {
    #[serde(default)]
    pub white_player: Option<String>,
    #[serde(default)]
    pub black_player: Option<String>,
}

/// Model choice of the `start` message. A model naming a configured
/// strategy profile selects that profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmChoice {
    #[serde(default)]
    pub model: Option<String>,
}

/// Messages sent by the browser.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "message", rename_all = "snake_case")]
pub enum ClientMessage {
    Start {
        #[serde(default)]
        options: PlayerOptions,
        #[serde(default)]
        board_state: Option<String>,
        #[serde(default)]
        llm_config: Option<LlmChoice>,
    },
    NextMove {
        #[serde(rename = "move", default)]
        mv: Squares,
    },
    /// Anything else is ignored.
    #[serde(other)]
    Other,
}

/// Messages sent to the browser.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "message", rename_all = "snake_case")]
pub enum ServerMessage {
    Started {
        id: String,
        board_state: String,
    },
    NextMoveReceived {
        #[serde(rename = "move")]
        mv: Option<Squares>,
        comment: String,
        board_state: String,
        outcome: Outcome,
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },
    Error {
        error: String,
    },
}

impl ServerMessage {
    fn error(error: impl ToString) -> Self {
        ServerMessage::Error {
            error: error.to_string(),
        }
    }
}

/// Axum handler for WebSocket upgrade requests.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut session: Option<String> = None;

    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let Some(reply) = handle_message(&state, &mut session, &text).await else {
            continue;
        };
        let json = match serde_json::to_string(&reply) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to encode websocket reply");
                continue;
            }
        };
        if sender.send(Message::Text(json)).await.is_err() {
            break;
        }
    }

    debug!(session_id = ?session, "websocket closed");
}

/// Handles one text frame; `session` is the game bound to the connection.
///
/// Returns the reply to send, if any.
pub async fn handle_message(
    state: &AppState,
    session: &mut Option<String>,
    text: &str,
) -> Option<ServerMessage> {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => return Some(ServerMessage::error(format!("invalid message: {e}"))),
    };

    match message {
        ClientMessage::Start {
            options,
            board_state,
            llm_config,
        } => {
            let strategy = llm_config
                .and_then(|llm| llm.model)
                .filter(|model| state.strategies.contains(model));
            let request = StartRequest {
                board_state,
                white_player: options.white_player,
                black_player: options.black_player,
                max_plies: None,
                strategy,
            };
            let new_session = match request.into_new_session() {
                Ok(new_session) => new_session,
                Err(e) => return Some(ServerMessage::error(e)),
            };
            match state
                .run(move |controller| controller.create_session(new_session))
                .await
            {
                Ok(snapshot) => {
                    info!(session_id = %snapshot.id, "websocket game started");
                    *session = Some(snapshot.id.clone());
                    Some(ServerMessage::Started {
                        id: snapshot.id,
                        board_state: snapshot.board_state,
                    })
                }
                Err(e) => Some(ServerMessage::error(e)),
            }
        }
        ClientMessage::NextMove { mv } => {
            let Some(id) = session.clone() else {
                return Some(ServerMessage::error("no game started on this connection"));
            };
            let input = (!mv.is_empty()).then(|| format!("{}{}", mv.from.trim(), mv.to.trim()));
            match play(state, id, input).await {
                Ok(reply) => Some(ServerMessage::NextMoveReceived {
                    mv: reply.mv,
                    comment: reply.comment,
                    board_state: reply.board_state,
                    outcome: reply.outcome,
                    summary: reply.summary,
                }),
                Err(e) => Some(ServerMessage::error(e)),
            }
        }
        ClientMessage::Other => None,
    }
}
