//! Seats, cells and the board/state record exchanged through the state file.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two competing sides. `Red` always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    #[serde(rename = "RED", alias = "SEAT_A", alias = "Red", alias = "red")]
    Red,
    #[serde(rename = "BLUE", alias = "SEAT_B", alias = "Blue", alias = "blue")]
    Blue,
}

impl Seat {
    pub const ALL: [Seat; 2] = [Seat::Red, Seat::Blue];

    /// Returns the stable uppercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "RED",
            Self::Blue => "BLUE",
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            Self::Red => Self::Blue,
            Self::Blue => Self::Red,
        }
    }

    /// Parses a seat name case-insensitively. `EMPTY`/`NONE` are not seats.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "RED" | "SEAT_A" => Some(Self::Red),
            "BLUE" | "SEAT_B" => Some(Self::Blue),
            _ => None,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A board cell. An owner is present if and only if the orb count is non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    owner: Option<Seat>,
    orb_count: u32,
}

impl Cell {
    pub const EMPTY: Cell = Cell {
        owner: None,
        orb_count: 0,
    };

    /// Builds an owned cell; a zero count collapses to an empty cell.
    pub fn owned(seat: Seat, orb_count: u32) -> Self {
        if orb_count == 0 {
            return Self::EMPTY;
        }
        Self {
            owner: Some(seat),
            orb_count,
        }
    }

    pub fn owner(&self) -> Option<Seat> {
        self.owner
    }

    pub fn orb_count(&self) -> u32 {
        self.orb_count
    }

    pub fn is_empty(&self) -> bool {
        self.owner.is_none()
    }
}

/// Row-major cell matrix.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Board {
    rows: Vec<Vec<Cell>>,
}

impl Board {
    /// Builds an all-empty `rows x cols` board.
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self {
            rows: vec![vec![Cell::EMPTY; cols]; rows],
        }
    }

    /// Wraps decoded rows as-is. Ragged rows are kept; see [`Board::is_rectangular`].
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_rectangular(&self) -> bool {
        let cols = self.col_count();
        self.rows.iter().all(|row| row.len() == cols)
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|cells| cells.get(col))
    }

    pub fn set_cell(&mut self, row: usize, col: usize, cell: Cell) -> bool {
        match self.rows.get_mut(row).and_then(|cells| cells.get_mut(col)) {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &Cell)> {
        self.rows.iter().enumerate().flat_map(|(row_index, row)| {
            row.iter()
                .enumerate()
                .map(move |(col_index, cell)| (row_index, col_index, cell))
        })
    }

    /// Saturates at `u32::MAX`; counts come from untrusted boards.
    pub fn total_orbs(&self) -> u32 {
        self.cells()
            .map(|(_, _, cell)| cell.orb_count())
            .fold(0, u32::saturating_add)
    }

    /// Sum of orbs on cells owned by `seat`, saturating like [`Board::total_orbs`].
    pub fn score(&self, seat: Seat) -> u32 {
        self.cells()
            .filter(|(_, _, cell)| cell.owner() == Some(seat))
            .map(|(_, _, cell)| cell.orb_count())
            .fold(0, u32::saturating_add)
    }
}

/// Full decoded state-file record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameState {
    pub board: Board,
    pub last_mover: Option<Seat>,
    pub move_count: u32,
    pub game_over: bool,
    pub winner: Option<Seat>,
}

impl GameState {
    /// A fresh session: empty board, nobody has moved.
    pub fn initial(rows: usize, cols: usize) -> Self {
        Self {
            board: Board::empty(rows, cols),
            ..Self::default()
        }
    }

    /// Seat to move next, derived from the last mover.
    pub fn current_player(&self) -> Seat {
        match self.last_mover {
            None => Seat::Red,
            Some(seat) => seat.opponent(),
        }
    }

    pub fn score(&self, seat: Seat) -> u32 {
        self.board.score(seat)
    }
}
