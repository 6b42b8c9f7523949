//! Line-oriented state-file codec.
//!
//! The worker may be rewriting the file while it is read, so decoding never
//! fails: unknown header lines and unrecognised cell tokens are skipped and
//! blank or token-free rows are dropped.

use crate::board::{Board, Cell, GameState, Seat};

pub const EMPTY_GLYPH: &str = "\u{26ab}";
pub const RED_GLYPH: &str = "\u{1f534}";
pub const BLUE_GLYPH: &str = "\u{1f535}";
pub const BOARD_HEADER: &str = "Board:";

const LAST_PLAYER_KEY: &str = "LastPlayer";
const MOVE_COUNT_KEY: &str = "MoveCount";
const GAME_OVER_KEY: &str = "GameOver";
const WINNER_KEY: &str = "Winner";
const NO_MOVER_VALUE: &str = "EMPTY";
const NO_WINNER_VALUE: &str = "None";
const VARIATION_SELECTOR: char = '\u{fe0f}';

const SEAT_GLYPHS: [(&str, Seat); 2] = [(RED_GLYPH, Seat::Red), (BLUE_GLYPH, Seat::Blue)];

/// Decodes state-file text, tolerating partial or foreign content.
pub fn decode_game_state(text: &str) -> GameState {
    let mut state = GameState::default();
    let mut lines = text.lines().map(str::trim);

    for line in lines.by_ref() {
        if line.starts_with(BOARD_HEADER) {
            break;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            LAST_PLAYER_KEY => state.last_mover = Seat::parse(value),
            MOVE_COUNT_KEY => state.move_count = value.parse::<u32>().unwrap_or(0),
            GAME_OVER_KEY => state.game_over = value.eq_ignore_ascii_case("true"),
            WINNER_KEY => state.winner = Seat::parse(value),
            _ => {}
        }
    }

    let rows = lines
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.split_whitespace()
                .filter_map(decode_cell_token)
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect::<Vec<_>>();
    state.board = Board::from_rows(rows);
    state
}

/// Encodes a state as header lines followed by the board block.
pub fn encode_game_state(state: &GameState) -> String {
    let mut lines = vec![
        format!(
            "{LAST_PLAYER_KEY}: {}",
            state.last_mover.map(Seat::as_str).unwrap_or(NO_MOVER_VALUE)
        ),
        format!("{MOVE_COUNT_KEY}: {}", state.move_count),
        format!("{GAME_OVER_KEY}: {}", state.game_over),
        format!(
            "{WINNER_KEY}: {}",
            state.winner.map(Seat::as_str).unwrap_or(NO_WINNER_VALUE)
        ),
        BOARD_HEADER.to_string(),
    ];
    lines.extend(encode_board_rows(&state.board));
    lines.join("\n")
}

pub(crate) fn encode_board_rows(board: &Board) -> Vec<String> {
    board
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .map(encode_cell_token)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn encode_cell_token(cell: &Cell) -> String {
    match cell.owner() {
        None => EMPTY_GLYPH.to_string(),
        Some(Seat::Red) => format!("{RED_GLYPH}{}", cell.orb_count()),
        Some(Seat::Blue) => format!("{BLUE_GLYPH}{}", cell.orb_count()),
    }
}

fn decode_cell_token(raw: &str) -> Option<Cell> {
    let token = raw.replace(VARIATION_SELECTOR, "");
    if token == EMPTY_GLYPH {
        return Some(Cell::EMPTY);
    }
    for (glyph, seat) in SEAT_GLYPHS {
        if let Some(count) = token.strip_prefix(glyph) {
            if count.is_empty() {
                return Some(Cell::owned(seat, 1));
            }
            return count.parse::<u32>().ok().map(|orbs| Cell::owned(seat, orbs));
        }
    }
    None
}
