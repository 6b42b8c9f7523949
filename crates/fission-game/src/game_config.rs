//! Canonical session configuration accepted from clients, its validation, and
//! the turn/seat rules the bridge enforces before asking the worker for an AI
//! move.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{GameState, Seat};

pub const MIN_BOARD_DIMENSION: usize = 3;
pub const MAX_BOARD_DIMENSION: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    #[serde(
        rename = "HUMAN_VS_HUMAN",
        alias = "USER_VS_USER",
        alias = "User vs User"
    )]
    HumanVsHuman,
    #[serde(rename = "HUMAN_VS_AI", alias = "USER_VS_AI", alias = "User vs AI")]
    HumanVsAi,
    #[serde(rename = "AI_VS_AI", alias = "AI vs AI")]
    AiVsAi,
}

impl GameMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HumanVsHuman => "HUMAN_VS_HUMAN",
            Self::HumanVsAi => "HUMAN_VS_AI",
            Self::AiVsAi => "AI_VS_AI",
        }
    }

    pub fn has_ai_seat(self) -> bool {
        !matches!(self, Self::HumanVsHuman)
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiKind {
    #[serde(rename = "MINIMAX", alias = "SMART", alias = "Smart")]
    Minimax,
    #[serde(rename = "RANDOM", alias = "Random")]
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "EASY", alias = "Easy")]
    Easy,
    #[serde(rename = "MEDIUM", alias = "Medium")]
    Medium,
    #[serde(rename = "HARD", alias = "Hard")]
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FirstPlayer {
    #[serde(rename = "HUMAN", alias = "Human")]
    Human,
    #[serde(rename = "AI")]
    Ai,
}

/// Per-seat AI settings used by AI vs AI sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatAiConfig {
    #[serde(rename = "type")]
    pub kind: AiKind,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub heuristic: Option<String>,
}

/// Raw init request body. Every field is optional so missing values surface
/// as validation failures rather than deserialisation errors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfigRequest {
    #[serde(default)]
    pub rows: Option<usize>,
    #[serde(default)]
    pub cols: Option<usize>,
    #[serde(default)]
    pub mode: Option<GameMode>,
    #[serde(default)]
    pub first_player: Option<FirstPlayer>,
    #[serde(default)]
    pub ai_type: Option<AiKind>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub heuristic: Option<String>,
    #[serde(default, rename = "redAI", alias = "redAi")]
    pub red_ai: Option<SeatAiConfig>,
    #[serde(default, rename = "blueAI", alias = "blueAi")]
    pub blue_ai: Option<SeatAiConfig>,
}

/// Validated session configuration. Replaced wholesale on every init.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub rows: usize,
    pub cols: usize,
    pub mode: GameMode,
    pub first_player: Option<FirstPlayer>,
    pub ai_type: Option<AiKind>,
    pub difficulty: Option<Difficulty>,
    pub heuristic: Option<String>,
    #[serde(rename = "redAI")]
    pub red_ai: Option<SeatAiConfig>,
    #[serde(rename = "blueAI")]
    pub blue_ai: Option<SeatAiConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid move: {0}")]
    InvalidMove(String),
    #[error("no game configuration found; initialize a game first")]
    NoActiveConfig,
    #[error("AI moves are not allowed in {mode} mode")]
    ModeHasNoAiSeat { mode: GameMode },
    #[error("{seat} is not controlled by an AI in this game")]
    NotAiSeat { seat: Seat },
    #[error("it is not {seat}'s turn; current player: {current}")]
    NotSeatTurn { seat: Seat, current: Seat },
    #[error("game is already over")]
    GameAlreadyOver,
}

impl ValidationError {
    /// Stable machine-readable code for API envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "invalid_config",
            Self::InvalidMove(_) => "invalid_move",
            Self::NoActiveConfig => "no_active_config",
            Self::ModeHasNoAiSeat { .. } => "mode_has_no_ai_seat",
            Self::NotAiSeat { .. } => "not_ai_seat",
            Self::NotSeatTurn { .. } => "not_seat_turn",
            Self::GameAlreadyOver => "game_already_over",
        }
    }
}

impl GameConfig {
    pub fn from_request(request: GameConfigRequest) -> Result<Self, ValidationError> {
        let (Some(rows), Some(cols)) = (request.rows, request.cols) else {
            return Err(ValidationError::InvalidConfig(
                "missing rows or cols".to_string(),
            ));
        };
        for (name, value) in [("rows", rows), ("cols", cols)] {
            if !(MIN_BOARD_DIMENSION..=MAX_BOARD_DIMENSION).contains(&value) {
                return Err(ValidationError::InvalidConfig(format!(
                    "{name} must be in range {MIN_BOARD_DIMENSION}..={MAX_BOARD_DIMENSION}, got {value}"
                )));
            }
        }
        Ok(Self {
            rows,
            cols,
            mode: request.mode.unwrap_or(GameMode::HumanVsHuman),
            first_player: request.first_player,
            ai_type: request.ai_type,
            difficulty: request.difficulty,
            heuristic: request
                .heuristic
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            red_ai: request.red_ai,
            blue_ai: request.blue_ai,
        })
    }

    /// Config used when a worker must be started without any init.
    pub fn human_vs_human(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            mode: GameMode::HumanVsHuman,
            first_player: None,
            ai_type: None,
            difficulty: None,
            heuristic: None,
            red_ai: None,
            blue_ai: None,
        }
    }

    /// Seats driven by the worker's AI.
    pub fn ai_seats(&self) -> Vec<Seat> {
        match self.mode {
            GameMode::HumanVsHuman => Vec::new(),
            GameMode::HumanVsAi => {
                if self.first_player == Some(FirstPlayer::Ai) {
                    vec![Seat::Red]
                } else {
                    vec![Seat::Blue]
                }
            }
            GameMode::AiVsAi => Seat::ALL.to_vec(),
        }
    }

    /// Seat-specific settings in AI vs AI mode, when both seats were configured.
    pub fn seat_ai_config(&self, seat: Seat) -> Option<&SeatAiConfig> {
        if self.mode != GameMode::AiVsAi {
            return None;
        }
        match (self.red_ai.as_ref(), self.blue_ai.as_ref()) {
            (Some(red), Some(blue)) => Some(match seat {
                Seat::Red => red,
                Seat::Blue => blue,
            }),
            _ => None,
        }
    }

    /// AI kind that will play `seat`; search-based unless configured otherwise.
    pub fn ai_kind_for(&self, seat: Seat) -> AiKind {
        self.seat_ai_config(seat)
            .map(|seat_config| seat_config.kind)
            .or(self.ai_type)
            .unwrap_or(AiKind::Minimax)
    }

    /// Checks that `seat` may ask the worker for an AI move in `state`.
    pub fn validate_ai_turn(&self, seat: Seat, state: &GameState) -> Result<(), ValidationError> {
        if !self.mode.has_ai_seat() {
            return Err(ValidationError::ModeHasNoAiSeat { mode: self.mode });
        }
        if !self.ai_seats().contains(&seat) {
            return Err(ValidationError::NotAiSeat { seat });
        }
        if state.game_over {
            return Err(ValidationError::GameAlreadyOver);
        }
        let current = state.current_player();
        if current != seat {
            return Err(ValidationError::NotSeatTurn { seat, current });
        }
        Ok(())
    }
}
