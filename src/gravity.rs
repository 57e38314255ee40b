//! Gravity compaction and refill.

use crate::rng::TokenSource;
use crate::types::{Board, Cell, Position};

/// Collapse one column downward, keeping the top-to-bottom order of its tokens.
/// Returns how many empty cells end up at the top.
pub fn compact_column(board: &mut Board, col: usize) -> usize {
    let mut write = board.rows();
    for row in (0..board.rows()).rev() {
        let cell = board.get(Position::new(row, col));
        if cell.is_empty() {
            continue;
        }
        write -= 1;
        if write != row {
            board.set(Position::new(write, col), cell);
            board.set(Position::new(row, col), Cell::Empty);
        }
    }
    write
}

/// Compact every column. Returns the total number of vacated cells.
pub fn compact(board: &mut Board) -> usize {
    (0..board.cols()).map(|col| compact_column(board, col)).sum()
}

/// Fill every empty cell with a fresh token, column by column, top to bottom.
/// New matches are allowed; they drive the next cascade iteration.
pub fn refill(board: &mut Board, kinds: u8, rng: &mut impl TokenSource) -> Vec<Position> {
    let mut filled = Vec::new();
    for col in 0..board.cols() {
        for row in 0..board.rows() {
            let pos = Position::new(row, col);
            if board.get(pos).is_empty() {
                board.set(pos, Cell::Occupied(rng.next_token(kinds)));
                filled.push(pos);
            }
        }
    }
    filled
}
