//! Local random move used when a random-kind AI seat times out in the worker.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::board::{GameState, Seat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BoardPosition {
    pub row: usize,
    pub col: usize,
}

/// Picks a uniformly random cell that is empty or already owned by `seat`.
pub fn random_move(state: &GameState, seat: Seat) -> Option<BoardPosition> {
    random_move_with_rng(state, seat, &mut rand::thread_rng())
}

pub fn random_move_with_rng<R>(state: &GameState, seat: Seat, rng: &mut R) -> Option<BoardPosition>
where
    R: Rng + ?Sized,
{
    let candidates = state
        .board
        .cells()
        .filter(|(_, _, cell)| cell.owner().map_or(true, |owner| owner == seat))
        .map(|(row, col, _)| BoardPosition { row, col })
        .collect::<Vec<_>>();
    candidates.choose(rng).copied()
}
