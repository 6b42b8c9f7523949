//! Game-state model and text protocol shared between the bridge and its worker.
//!
//! Provides the board/seat types, the line-oriented state-file codec, the
//! snapshot texts the bridge writes, the canonical session configuration and
//! its translation into the worker's vocabulary, and the local random-move
//! fallback.

pub mod board;
pub mod fallback_move;
pub mod game_config;
pub mod snapshot_text;
pub mod state_codec;
pub mod worker_vocabulary;

pub use board::{Board, Cell, GameState, Seat};
pub use fallback_move::{random_move, random_move_with_rng, BoardPosition};
pub use game_config::{
    AiKind, Difficulty, FirstPlayer, GameConfig, GameConfigRequest, GameMode, SeatAiConfig,
    ValidationError, MAX_BOARD_DIMENSION, MIN_BOARD_DIMENSION,
};
pub use snapshot_text::{
    append_ai_move_request, render_cleared_snapshot, render_initial_snapshot,
    render_move_request, ClearedSnapshotKind, CompletionMarker, MoveRequestSnapshot,
};
pub use state_codec::{decode_game_state, encode_game_state};
pub use worker_vocabulary::{translate_game_config, WorkerHandoffConfig};
