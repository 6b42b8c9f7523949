//! Translation of the canonical [`GameConfig`] into the worker's vocabulary
//! and the JSON handoff document the worker reads once at startup.

use serde::Serialize;

use crate::board::Seat;
use crate::game_config::{AiKind, Difficulty, FirstPlayer, GameConfig, GameMode, SeatAiConfig};

const DEFAULT_HEURISTIC: &str = "combined_v2";
const DEFAULT_BLUE_SEAT_HEURISTIC: &str = "orb_count";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkerMode {
    #[serde(rename = "User vs User")]
    UserVsUser,
    #[serde(rename = "User vs AI")]
    UserVsAi,
    #[serde(rename = "AI vs AI")]
    AiVsAi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkerAiKind {
    Smart,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkerDifficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkerFirstPlayer {
    Human,
    #[serde(rename = "AI")]
    Ai,
    Red,
}

impl From<GameMode> for WorkerMode {
    fn from(mode: GameMode) -> Self {
        match mode {
            GameMode::HumanVsHuman => Self::UserVsUser,
            GameMode::HumanVsAi => Self::UserVsAi,
            GameMode::AiVsAi => Self::AiVsAi,
        }
    }
}

impl From<AiKind> for WorkerAiKind {
    fn from(kind: AiKind) -> Self {
        match kind {
            AiKind::Minimax => Self::Smart,
            AiKind::Random => Self::Random,
        }
    }
}

impl From<Difficulty> for WorkerDifficulty {
    fn from(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self::Easy,
            Difficulty::Medium => Self::Medium,
            Difficulty::Hard => Self::Hard,
        }
    }
}

impl From<FirstPlayer> for WorkerFirstPlayer {
    fn from(first_player: FirstPlayer) -> Self {
        match first_player {
            FirstPlayer::Human => Self::Human,
            FirstPlayer::Ai => Self::Ai,
        }
    }
}

/// One seat's AI in an AI vs AI handoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum WorkerSeatAi {
    Smart {
        difficulty: WorkerDifficulty,
        heuristic: String,
    },
    Random,
}

/// Handoff document shapes understood by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WorkerHandoffConfig {
    #[serde(rename_all = "camelCase")]
    SmartAi {
        rows: usize,
        cols: usize,
        mode: WorkerMode,
        ai_type: WorkerAiKind,
        difficulty: WorkerDifficulty,
        first_player: WorkerFirstPlayer,
        heuristic: String,
    },
    #[serde(rename_all = "camelCase")]
    RandomAi {
        rows: usize,
        cols: usize,
        mode: WorkerMode,
        ai_type: WorkerAiKind,
        first_player: WorkerFirstPlayer,
    },
    #[serde(rename_all = "camelCase")]
    PerSeatAi {
        rows: usize,
        cols: usize,
        mode: WorkerMode,
        #[serde(rename = "redAI")]
        red_ai: WorkerSeatAi,
        #[serde(rename = "blueAI")]
        blue_ai: WorkerSeatAi,
        first_player: WorkerFirstPlayer,
    },
}

impl WorkerHandoffConfig {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Maps every canonical field to exactly one worker value, filling documented
/// defaults for absent fields.
pub fn translate_game_config(config: &GameConfig) -> WorkerHandoffConfig {
    let mode = WorkerMode::from(config.mode);
    if let (Some(red), Some(blue)) = (
        config.seat_ai_config(Seat::Red),
        config.seat_ai_config(Seat::Blue),
    ) {
        return WorkerHandoffConfig::PerSeatAi {
            rows: config.rows,
            cols: config.cols,
            mode,
            red_ai: translate_seat_ai(red, DEFAULT_HEURISTIC),
            blue_ai: translate_seat_ai(blue, DEFAULT_BLUE_SEAT_HEURISTIC),
            first_player: WorkerFirstPlayer::Red,
        };
    }

    let first_player = config
        .first_player
        .map(WorkerFirstPlayer::from)
        .unwrap_or(WorkerFirstPlayer::Human);
    match WorkerAiKind::from(config.ai_type.unwrap_or(AiKind::Minimax)) {
        WorkerAiKind::Random => WorkerHandoffConfig::RandomAi {
            rows: config.rows,
            cols: config.cols,
            mode,
            ai_type: WorkerAiKind::Random,
            first_player,
        },
        WorkerAiKind::Smart => WorkerHandoffConfig::SmartAi {
            rows: config.rows,
            cols: config.cols,
            mode,
            ai_type: WorkerAiKind::Smart,
            difficulty: config
                .difficulty
                .map(WorkerDifficulty::from)
                .unwrap_or(WorkerDifficulty::Medium),
            first_player,
            heuristic: config
                .heuristic
                .clone()
                .unwrap_or_else(|| DEFAULT_HEURISTIC.to_string()),
        },
    }
}

fn translate_seat_ai(seat: &SeatAiConfig, default_heuristic: &str) -> WorkerSeatAi {
    match WorkerAiKind::from(seat.kind) {
        WorkerAiKind::Random => WorkerSeatAi::Random,
        WorkerAiKind::Smart => WorkerSeatAi::Smart {
            difficulty: seat
                .difficulty
                .map(WorkerDifficulty::from)
                .unwrap_or(WorkerDifficulty::Medium),
            heuristic: seat
                .heuristic
                .clone()
                .unwrap_or_else(|| default_heuristic.to_string()),
        },
    }
}
