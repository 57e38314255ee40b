//! Core data types for the match engine.
//!
//! The board uses flat `Vec` storage with row-major layout:
//! `cells[row * cols + col]`, row 0 at the top, rows grow downward.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::error::EngineError;

/// One symbol of the token alphabet. Only identity matters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TokenType(u8);

impl TokenType {
    pub const fn new(kind: u8) -> Self {
        Self(kind)
    }

    #[inline(always)]
    pub const fn index(self) -> u8 {
        self.0
    }
}

/// A board cell. `Empty` only exists while a cascade is being resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cell {
    Occupied(TokenType),
    Empty,
}

impl Cell {
    #[inline(always)]
    pub fn token(self) -> Option<TokenType> {
        match self {
            Cell::Occupied(t) => Some(t),
            Cell::Empty => None,
        }
    }

    #[inline(always)]
    pub fn is_empty(self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Flat code used across the JS boundary: token index, or -1 for empty.
    #[inline(always)]
    pub fn code(self) -> i8 {
        match self {
            Cell::Occupied(t) => t.index() as i8,
            Cell::Empty => -1,
        }
    }
}

/// A (row, col) grid coordinate. Ordered row-major.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// True when the two positions are orthogonal neighbours (Manhattan distance 1).
    pub fn is_adjacent(self, other: Position) -> bool {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col) == 1
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// An R×C grid of cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// Create a board with every cell empty.
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![Cell::Empty; rows * cols],
        }
    }

    /// Build a fully occupied board from row-major token indices.
    pub fn from_tokens(rows: usize, cols: usize, tokens: &[u8]) -> Result<Self, EngineError> {
        if tokens.len() != rows * cols {
            return Err(EngineError::InvalidConfig(format!(
                "{} tokens cannot fill a {rows}x{cols} board",
                tokens.len()
            )));
        }
        Ok(Self {
            rows,
            cols,
            cells: tokens.iter().map(|&k| Cell::Occupied(TokenType::new(k))).collect(),
        })
    }

    /// Build a board from a slice of equal-length rows of token indices.
    pub fn from_rows(rows: &[&[u8]]) -> Result<Self, EngineError> {
        let cols = rows.first().map_or(0, |r| r.len());
        if let Some(bad) = rows.iter().find(|r| r.len() != cols) {
            return Err(EngineError::BoardShape {
                expected_rows: rows.len(),
                expected_cols: cols,
                rows: rows.len(),
                cols: bad.len(),
            });
        }
        let flat: Vec<u8> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Self::from_tokens(rows.len(), cols, &flat)
    }

    #[inline(always)]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    #[inline(always)]
    fn index(&self, pos: Position) -> usize {
        pos.row * self.cols + pos.col
    }

    /// Cell at `pos`. Panics if out of bounds; callers check `in_bounds` first.
    #[inline(always)]
    pub fn get(&self, pos: Position) -> Cell {
        self.cells[self.index(pos)]
    }

    #[inline(always)]
    pub fn set(&mut self, pos: Position, cell: Cell) {
        let idx = self.index(pos);
        self.cells[idx] = cell;
    }

    /// Exchange the contents of two in-bounds cells.
    pub fn swap(&mut self, a: Position, b: Position) {
        let (ia, ib) = (self.index(a), self.index(b));
        self.cells.swap(ia, ib);
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Number of empty cells on the board.
    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_empty()).count()
    }

    /// Flat row-major codes (token index, -1 = empty).
    pub fn codes(&self) -> Vec<i8> {
        self.cells.iter().map(|c| c.code()).collect()
    }

    /// Codes of one column, top to bottom.
    pub fn column_codes(&self, col: usize) -> Vec<i8> {
        (0..self.rows)
            .map(|row| self.get(Position::new(row, col)).code())
            .collect()
    }
}

impl Serialize for Board {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Board", 3)?;
        s.serialize_field("rows", &self.rows)?;
        s.serialize_field("cols", &self.cols)?;
        s.serialize_field("cells", &self.codes())?;
        s.end()
    }
}
