//! Match detection.
//!
//! Scans rightward and downward from every origin cell and reports runs of at
//! least `min_match` equal tokens. Empty cells never take part in a run.

use std::collections::BTreeSet;

use crate::types::{Board, Position};

/// Direction of a scan from an origin cell.
#[derive(Clone, Copy)]
enum Axis {
    Right,
    Down,
}

impl Axis {
    #[inline(always)]
    fn step(self, origin: Position, k: usize) -> Position {
        match self {
            Axis::Right => Position::new(origin.row, origin.col + k),
            Axis::Down => Position::new(origin.row + k, origin.col),
        }
    }

    #[inline(always)]
    fn room(self, board: &Board, origin: Position) -> usize {
        match self {
            Axis::Right => board.cols() - origin.col,
            Axis::Down => board.rows() - origin.row,
        }
    }
}

/// Length of the equal-token run starting at `origin` along `axis`.
fn run_length(board: &Board, origin: Position, axis: Axis) -> usize {
    let Some(token) = board.get(origin).token() else {
        return 0;
    };
    let room = axis.room(board, origin);
    let mut len = 1;
    while len < room && board.get(axis.step(origin, len)).token() == Some(token) {
        len += 1;
    }
    len
}

/// True if any horizontal or vertical run reaches `min_match`.
pub fn has_matches(board: &Board, min_match: usize) -> bool {
    for row in 0..board.rows() {
        for col in 0..board.cols() {
            let origin = Position::new(row, col);
            if run_length(board, origin, Axis::Right) >= min_match
                || run_length(board, origin, Axis::Down) >= min_match
            {
                return true;
            }
        }
    }
    false
}

/// Every position that belongs to a match, deduplicated and row-major ordered.
///
/// A run of length L is seen once per origin inside it; the set absorbs the
/// repeats, and a cell on both a row and a column match appears once.
pub fn find_matches(board: &Board, min_match: usize) -> BTreeSet<Position> {
    let mut matched = BTreeSet::new();
    for row in 0..board.rows() {
        for col in 0..board.cols() {
            let origin = Position::new(row, col);
            for axis in [Axis::Right, Axis::Down] {
                let len = run_length(board, origin, axis);
                if len >= min_match {
                    matched.extend((0..len).map(|k| axis.step(origin, k)));
                }
            }
        }
    }
    matched
}
