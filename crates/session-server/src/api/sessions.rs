//! Session API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chess_rules::NotationError;
use chess_session::{
    Advance, MoverKind, NewSession, Outcome, SideAssignment, Snapshot, TurnLedger,
};
use serde::{Deserialize, Serialize};

use crate::{ApiError, AppState};

/// Reads a player type as offered by the browser client: `human`, `ai` or
/// `random`, plus the library names `user` and `automated`.
pub fn player_kind(name: &str) -> Result<MoverKind, ApiError> {
    match name.trim().to_ascii_lowercase().as_str() {
        // Random players pick on the client and send squares like a human.
        "random" => Ok(MoverKind::Human),
        other => other
            .parse()
            .map_err(|e: NotationError| ApiError::Invalid(e.to_string())),
    }
}

/// Body of `POST /api/sessions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartRequest {
    /// Starting FEN; empty or absent means the standard start.
    #[serde(default)]
    pub board_state: Option<String>,
    #[serde(default)]
    pub white_player: Option<String>,
    #[serde(default)]
    pub black_player: Option<String>,
    #[serde(default)]
    pub max_plies: Option<u32>,
    #[serde(default)]
    pub strategy: Option<String>,
}

impl StartRequest {
    /// Resolves player names; a side left out keeps its default kind.
    pub fn into_new_session(self) -> Result<NewSession, ApiError> {
        let sides = match (self.white_player.as_deref(), self.black_player.as_deref()) {
            (None, None) => None,
            (white, black) => {
                let defaults = SideAssignment::default();
                Some(SideAssignment::new(
                    white.map(player_kind).transpose()?.unwrap_or(defaults.white),
                    black.map(player_kind).transpose()?.unwrap_or(defaults.black),
                ))
            }
        };
        Ok(NewSession {
            initial_fen: self.board_state,
            sides,
            max_plies: self.max_plies,
            strategy: self.strategy,
        })
    }
}

/// Response of `POST /api/sessions`.
#[derive(Debug, Clone, Serialize)]
pub struct StartReply {
    pub id: String,
    pub snapshot: Snapshot,
}

/// A move as the board UI names it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Squares {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
}

impl Squares {
    /// True if no move was given, which asks for an automated move.
    pub fn is_empty(&self) -> bool {
        self.from.trim().is_empty() && self.to.trim().is_empty()
    }
}

/// Body of `POST /api/sessions/:id/moves`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitMove {
    pub from: String,
    pub to: String,
    /// Promotion piece letter (`q`, `r`, `b`, `n`).
    #[serde(default)]
    pub promotion: Option<String>,
}

impl SubmitMove {
    /// The move in long algebraic form, e.g. `e7e8q`.
    pub fn notation(&self) -> String {
        format!(
            "{}{}{}",
            self.from.trim(),
            self.to.trim(),
            self.promotion.as_deref().unwrap_or("").trim()
        )
    }
}

/// Result of one played ply.
#[derive(Debug, Clone, Serialize)]
pub struct MoveReply {
    /// Absent if the game was already decided before anyone moved.
    #[serde(rename = "move")]
    pub mv: Option<Squares>,
    pub san: Option<String>,
    pub comment: String,
    pub mover: Option<MoverKind>,
    /// Set when an illegal move was replaced by an automated one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_input: Option<String>,
    pub board_state: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Kind of mover expected next; absent once the game is over.
    pub awaiting: Option<MoverKind>,
}

impl MoveReply {
    pub fn new(advance: &Advance, snapshot: &Snapshot) -> Self {
        let ply = advance.ply.as_ref();
        MoveReply {
            mv: ply.map(|ply| Squares {
                from: ply.notation.from.to_string(),
                to: ply.notation.to.to_string(),
            }),
            san: ply.map(|ply| ply.san.clone()),
            comment: ply.map(|ply| ply.comment.clone()).unwrap_or_default(),
            mover: ply.map(|ply| ply.mover.kind),
            rejected_input: ply.and_then(|ply| ply.rejected_input.clone()),
            board_state: snapshot.board_state.clone(),
            outcome: snapshot.outcome,
            summary: snapshot.summary.clone(),
            awaiting: snapshot.awaiting,
        }
    }
}

/// Plays one ply and describes the session afterwards.
pub(crate) async fn play(
    state: &AppState,
    id: String,
    input: Option<String>,
) -> Result<MoveReply, ApiError> {
    state
        .run(move |controller| {
            let (advance, snapshot) = controller.advance_and_snapshot(&id, input.as_deref())?;
            Ok(MoveReply::new(&advance, &snapshot))
        })
        .await
}

/// Start a session.
///
/// # Endpoint
///
/// `POST /api/sessions`
///
/// # Response
///
/// - `201 Created`: `{ id, snapshot }`
/// - `422 Unprocessable Entity`: unknown player type or invalid FEN
/// - `503 Service Unavailable`: unknown strategy profile
pub async fn start_session(
    State(state): State<AppState>,
    Json(body): Json<StartRequest>,
) -> Result<(StatusCode, Json<StartReply>), ApiError> {
    let request = body.into_new_session()?;
    let snapshot = state
        .run(move |controller| controller.create_session(request))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(StartReply {
            id: snapshot.id.clone(),
            snapshot,
        }),
    ))
}

/// List all stored sessions, oldest first.
///
/// # Endpoint
///
/// `GET /api/sessions`
pub async fn list_sessions(State(state): State<AppState>) -> Result<Json<Vec<Snapshot>>, ApiError> {
    state.run(|controller| controller.list()).await.map(Json)
}

/// Get the current state of a session.
///
/// # Endpoint
///
/// `GET /api/sessions/:id`
///
/// # Response
///
/// - `200 OK`: session snapshot
/// - `404 Not Found`: no such session
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Snapshot>, ApiError> {
    state
        .run(move |controller| controller.snapshot(&id))
        .await
        .map(Json)
}

/// Get the full move history of a session.
///
/// # Endpoint
///
/// `GET /api/sessions/:id/ledger`
pub async fn get_ledger(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TurnLedger>, ApiError> {
    state
        .run(move |controller| controller.ledger(&id))
        .await
        .map(Json)
}

/// Delete a session.
///
/// # Endpoint
///
/// `DELETE /api/sessions/:id`
///
/// # Response
///
/// - `204 No Content`: deleted
/// - `404 Not Found`: no such session
pub async fn discard_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .run(move |controller| controller.discard(&id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Submit the move of a human side.
///
/// # Endpoint
///
/// `POST /api/sessions/:id/moves`
///
/// # Response
///
/// - `200 OK`: the ply played. An illegal move is replaced by an automated
///   one and reported through `rejected_input`.
/// - `409 Conflict`: the game is over
/// - `422 Unprocessable Entity`: the move text is malformed
pub async fn submit_move(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SubmitMove>,
) -> Result<Json<MoveReply>, ApiError> {
    play(&state, id, Some(body.notation())).await.map(Json)
}

/// Ask the automated mover of the side to move for its move.
///
/// # Endpoint
///
/// `POST /api/sessions/:id/auto`
///
/// # Response
///
/// - `200 OK`: the ply played
/// - `422 Unprocessable Entity`: the side to move is human
/// - `503 Service Unavailable`: the strategy failed
pub async fn automated_move(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MoveReply>, ApiError> {
    play(&state, id, None).await.map(Json)
}
