use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fission_game::{Board, Cell, GameState, MoveRequestSnapshot, Seat};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::session_coordinator::SessionError;

const EMPTY_PLAYER: &str = "EMPTY";

#[derive(Debug)]
pub(super) struct GameApiError {
    pub(super) status: StatusCode,
    pub(super) code: &'static str,
    pub(super) message: String,
}

impl GameApiError {
    pub(super) fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub(super) fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }
}

impl From<SessionError> for GameApiError {
    fn from(error: SessionError) -> Self {
        let status = match &error {
            SessionError::Validation(_) => StatusCode::BAD_REQUEST,
            SessionError::AiTimeout { .. } => StatusCode::REQUEST_TIMEOUT,
            SessionError::Worker(_) | SessionError::Channel(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, error.code(), error.to_string())
    }
}

impl IntoResponse for GameApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "success": false,
                "error": {
                    "code": self.code,
                    "message": self.message,
                }
            })),
        )
            .into_response()
    }
}

/// Client-facing rendering of a decoded state.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(super) struct GameStateView {
    pub(super) last_player: &'static str,
    pub(super) move_count: u32,
    pub(super) game_over: bool,
    pub(super) winner: Option<Seat>,
    pub(super) current_player: Option<Seat>,
    pub(super) board: Vec<Vec<CellView>>,
    pub(super) scores: ScoresView,
}

impl From<&GameState> for GameStateView {
    fn from(state: &GameState) -> Self {
        Self {
            last_player: state.last_mover.map(Seat::as_str).unwrap_or(EMPTY_PLAYER),
            move_count: state.move_count,
            game_over: state.game_over,
            winner: state.winner,
            current_player: (!state.game_over).then(|| state.current_player()),
            board: state
                .board
                .rows()
                .iter()
                .map(|row| row.iter().map(CellView::from).collect())
                .collect(),
            scores: ScoresView {
                red: state.score(Seat::Red),
                blue: state.score(Seat::Blue),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub(super) struct CellView {
    pub(super) player: &'static str,
    pub(super) orbs: u32,
}

impl From<&Cell> for CellView {
    fn from(cell: &Cell) -> Self {
        Self {
            player: cell.owner().map(Seat::as_str).unwrap_or(EMPTY_PLAYER),
            orbs: cell.orb_count(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub(super) struct ScoresView {
    #[serde(rename = "RED")]
    pub(super) red: u32,
    #[serde(rename = "BLUE")]
    pub(super) blue: u32,
}

#[derive(Debug, Deserialize)]
pub(super) struct CellInput {
    pub(super) player: String,
    #[serde(default)]
    pub(super) orbs: u32,
}

/// Body of `POST /game/move`: the pre-move board and the cell being played.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MoveRequestBody {
    pub(super) board: Vec<Vec<CellInput>>,
    pub(super) row: usize,
    pub(super) col: usize,
    #[serde(alias = "currentPlayer")]
    pub(super) current_seat: String,
}

impl MoveRequestBody {
    pub(super) fn into_move_request(self) -> Result<MoveRequestSnapshot, GameApiError> {
        let mover = Seat::parse(&self.current_seat).ok_or_else(|| {
            GameApiError::bad_request(
                "invalid_move",
                format!("unknown seat '{}'", self.current_seat),
            )
        })?;
        let mut rows = Vec::with_capacity(self.board.len());
        for (row_index, row) in self.board.into_iter().enumerate() {
            let mut cells = Vec::with_capacity(row.len());
            for (col_index, cell) in row.into_iter().enumerate() {
                cells.push(parse_cell_input(&cell).ok_or_else(|| {
                    GameApiError::bad_request(
                        "invalid_move",
                        format!(
                            "cell ({row_index}, {col_index}) has invalid player '{}' with {} orbs",
                            cell.player, cell.orbs
                        ),
                    )
                })?);
            }
            rows.push(cells);
        }
        Ok(MoveRequestSnapshot {
            board: Board::from_rows(rows),
            row: self.row,
            col: self.col,
            mover,
        })
    }
}

fn parse_cell_input(cell: &CellInput) -> Option<Cell> {
    let player = cell.player.trim();
    if player.eq_ignore_ascii_case(EMPTY_PLAYER) || player.eq_ignore_ascii_case("NONE") {
        return (cell.orbs == 0).then_some(Cell::EMPTY);
    }
    Seat::parse(player).map(|seat| Cell::owned(seat, cell.orbs))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct AiMoveRequestBody {
    #[serde(default, alias = "player")]
    pub(super) seat: Option<String>,
}

impl AiMoveRequestBody {
    pub(super) fn requested_seat(&self) -> Result<Option<Seat>, GameApiError> {
        match self.seat.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Seat::parse(raw).map(Some).ok_or_else(|| {
                GameApiError::bad_request("invalid_seat", format!("unknown seat '{raw}'"))
            }),
        }
    }
}
