//! Snapshot texts written by the bridge and the marker predicates used to
//! recognise the worker's answers.

use crate::board::{Board, GameState, Seat};
use crate::state_codec::encode_game_state;

pub const GAME_START_TITLE: &str = "Game Start:";
pub const GAME_RESET_TITLE: &str = "Game Reset:";
pub const GAME_STOPPED_TITLE: &str = "Game Stopped:";
pub const HUMAN_MOVE_REQUEST_TITLE: &str = "Human Move Request:";
pub const AI_MOVE_REQUEST_MARKER: &str = "AI_MOVE_REQUEST";
pub const MOVE_PROCESSED_MARKER: &str = "Move Processed";
pub const GAME_OVER_MARKER: &str = "Game Over";
pub const AI_MOVE_MARKER: &str = "AI Move";
const LAST_PLAYER_MARKER: &str = "LastPlayer:";

/// Which blank snapshot to write. The placeholder line differs per kind so a
/// reader can tell a stopped or reset session from a pre-init clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearedSnapshotKind {
    /// Written by init just before the fresh board.
    InitClear,
    Reset,
    Stopped,
}

impl ClearedSnapshotKind {
    fn title(self) -> &'static str {
        match self {
            Self::InitClear | Self::Reset => GAME_RESET_TITLE,
            Self::Stopped => GAME_STOPPED_TITLE,
        }
    }

    fn placeholder(self) -> &'static str {
        match self {
            Self::InitClear => "(clearing previous state)",
            Self::Reset => "(will be initialized with new game)",
            Self::Stopped => "(no active game)",
        }
    }
}

/// Blank snapshot with no board rows.
pub fn render_cleared_snapshot(kind: ClearedSnapshotKind) -> String {
    let blank = encode_game_state(&GameState::default());
    format!("{}\n{blank}\n{}", kind.title(), kind.placeholder())
}

/// Fresh `rows x cols` empty board announced as a game start.
pub fn render_initial_snapshot(rows: usize, cols: usize) -> String {
    format!(
        "{GAME_START_TITLE}\n{}",
        encode_game_state(&GameState::initial(rows, cols))
    )
}

/// A human move to be applied by the worker on top of the supplied pre-move board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequestSnapshot {
    pub board: Board,
    pub row: usize,
    pub col: usize,
    pub mover: Seat,
}

impl MoveRequestSnapshot {
    /// State as seen just before `mover` plays: with no orbs on the board
    /// nobody has moved yet, otherwise the opponent moved last.
    pub fn pre_move_state(&self) -> GameState {
        let total_orbs = self.board.total_orbs();
        GameState {
            board: self.board.clone(),
            last_mover: (total_orbs > 0).then(|| self.mover.opponent()),
            move_count: total_orbs,
            game_over: false,
            winner: None,
        }
    }
}

pub fn render_move_request(request: &MoveRequestSnapshot) -> String {
    format!(
        "{HUMAN_MOVE_REQUEST_TITLE}\nPlayer: {}\nRow: {}\nCol: {}\n{}",
        request.mover,
        request.row,
        request.col,
        encode_game_state(&request.pre_move_state())
    )
}

/// Appends the pending AI request marker to the current snapshot.
pub fn append_ai_move_request(current: &str, seat: Seat) -> String {
    format!("{current}\n{AI_MOVE_REQUEST_MARKER}:{seat}")
}

/// Marker predicate deciding that a changed snapshot is the worker's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMarker {
    MoveProcessed,
    AiMoveApplied,
}

impl CompletionMarker {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MoveProcessed => "move_processed",
            Self::AiMoveApplied => "ai_move_applied",
        }
    }

    pub fn is_satisfied_by(self, text: &str) -> bool {
        match self {
            Self::MoveProcessed => {
                text.contains(MOVE_PROCESSED_MARKER)
                    || text.contains(GAME_OVER_MARKER)
                    || (text.contains(LAST_PLAYER_MARKER)
                        && !text.contains(HUMAN_MOVE_REQUEST_TITLE)
                        && !is_bridge_authored(text))
            }
            Self::AiMoveApplied => {
                !text.contains(AI_MOVE_REQUEST_MARKER)
                    && (text.contains(AI_MOVE_MARKER) || text.contains(GAME_OVER_MARKER))
            }
        }
    }
}

/// Snapshots the bridge itself writes on init, stop and reset. A poll that
/// observes one of these was overtaken by a session change.
fn is_bridge_authored(text: &str) -> bool {
    let title = text.lines().map(str::trim).find(|line| !line.is_empty());
    matches!(
        title,
        Some(GAME_START_TITLE | GAME_RESET_TITLE | GAME_STOPPED_TITLE)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Cell;
    use crate::state_codec::decode_game_state;

    #[test]
    fn unit_initial_snapshot_decodes_to_empty_board_of_requested_size() {
        for (rows, cols) in [(3, 3), (5, 7), (9, 6)] {
            let state = decode_game_state(&render_initial_snapshot(rows, cols));
            assert_eq!(state.board.row_count(), rows);
            assert_eq!(state.board.col_count(), cols);
            assert!(state.board.cells().all(|(_, _, cell)| cell.is_empty()));
            assert_eq!(state.move_count, 0);
            assert!(!state.game_over);
            assert_eq!(state.last_mover, None);
        }
    }

    #[test]
    fn unit_cleared_snapshots_have_no_board_and_differ_from_each_other() {
        let init_clear = render_cleared_snapshot(ClearedSnapshotKind::InitClear);
        let reset = render_cleared_snapshot(ClearedSnapshotKind::Reset);
        let stopped = render_cleared_snapshot(ClearedSnapshotKind::Stopped);
        assert_ne!(init_clear, reset);
        assert_ne!(reset, stopped);
        for text in [&init_clear, &reset, &stopped] {
            assert_eq!(decode_game_state(text).board.row_count(), 0);
            assert!(!text.contains(GAME_START_TITLE));
        }
    }

    #[test]
    fn unit_move_request_derives_last_mover_and_move_count_from_board() {
        let opening = MoveRequestSnapshot {
            board: Board::empty(3, 3),
            row: 1,
            col: 2,
            mover: Seat::Red,
        };
        let text = render_move_request(&opening);
        assert!(text.starts_with("Human Move Request:\nPlayer: RED\nRow: 1\nCol: 2\nLastPlayer: EMPTY\nMoveCount: 0\n"));

        let mut board = Board::empty(3, 3);
        board.set_cell(0, 0, Cell::owned(Seat::Red, 1));
        board.set_cell(2, 2, Cell::owned(Seat::Blue, 2));
        let later = MoveRequestSnapshot {
            board,
            row: 0,
            col: 0,
            mover: Seat::Red,
        };
        let state = decode_game_state(&render_move_request(&later));
        assert_eq!(state.last_mover, Some(Seat::Blue));
        assert_eq!(state.move_count, 3);
        assert_eq!(state.current_player(), Seat::Red);
    }

    #[test]
    fn regression_move_request_with_saturated_orbs_renders_without_overflow() {
        let mut board = Board::empty(3, 3);
        board.set_cell(0, 0, Cell::owned(Seat::Red, u32::MAX));
        board.set_cell(1, 1, Cell::owned(Seat::Blue, 5));
        let request = MoveRequestSnapshot {
            board,
            row: 2,
            col: 2,
            mover: Seat::Red,
        };
        let state = decode_game_state(&render_move_request(&request));
        assert_eq!(state.move_count, u32::MAX);
        assert_eq!(state.last_mover, Some(Seat::Blue));
    }

    #[test]
    fn unit_move_marker_rejects_unprocessed_request_and_accepts_worker_answer() {
        let request = render_move_request(&MoveRequestSnapshot {
            board: Board::empty(3, 3),
            row: 0,
            col: 0,
            mover: Seat::Red,
        });
        assert!(!CompletionMarker::MoveProcessed.is_satisfied_by(&request));
        assert!(CompletionMarker::MoveProcessed
            .is_satisfied_by("Move Processed:\nLastPlayer: RED\nBoard:\n"));
        assert!(CompletionMarker::MoveProcessed.is_satisfied_by("LastPlayer: RED\nBoard:\n"));
        assert!(CompletionMarker::MoveProcessed.is_satisfied_by("Game Over:\nWinner: RED"));
    }

    #[test]
    fn regression_move_marker_ignores_snapshots_written_by_init_stop_or_reset() {
        assert!(!CompletionMarker::MoveProcessed.is_satisfied_by(&render_initial_snapshot(3, 3)));
        for kind in [
            ClearedSnapshotKind::InitClear,
            ClearedSnapshotKind::Reset,
            ClearedSnapshotKind::Stopped,
        ] {
            assert!(!CompletionMarker::MoveProcessed
                .is_satisfied_by(&render_cleared_snapshot(kind)));
        }
    }

    #[test]
    fn unit_ai_marker_requires_request_marker_to_be_consumed() {
        let current = render_initial_snapshot(3, 3);
        let pending = append_ai_move_request(&current, Seat::Blue);
        assert!(pending.ends_with("\nAI_MOVE_REQUEST:BLUE"));
        assert!(!CompletionMarker::AiMoveApplied.is_satisfied_by(&pending));
        assert!(!CompletionMarker::AiMoveApplied
            .is_satisfied_by("Smart AI Move:\nBoard:\nAI_MOVE_REQUEST:BLUE"));
        assert!(CompletionMarker::AiMoveApplied.is_satisfied_by("Random AI Move:\nBoard:\n"));
        assert!(!CompletionMarker::AiMoveApplied.is_satisfied_by(&current));
    }
}
