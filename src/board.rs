//! Board generation: random fill and zero-match rejection.
//!
//! `generate_board()` runs the whole `do { fill } while (hasMatches)` retry
//! loop inside the engine, bounded by `max_generation_attempts`.

use tracing::{debug, error};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::matcher;
use crate::rng::TokenSource;
use crate::types::{Board, Cell, Position};

/// Fill every cell with a random token, drawing row-major.
pub fn fill_random(rows: usize, cols: usize, kinds: u8, rng: &mut impl TokenSource) -> Board {
    let mut board = Board::empty(rows, cols);
    for row in 0..rows {
        for col in 0..cols {
            board.set(Position::new(row, col), Cell::Occupied(rng.next_token(kinds)));
        }
    }
    board
}

/// Result of a successful generation.
#[derive(Debug, Clone)]
pub struct GeneratedBoard {
    pub board: Board,
    /// How many random layouts were tried before finding a match-free one.
    pub attempts: u32,
}

/// Generate a board with no pre-existing match by regenerating the whole grid
/// until one passes.
pub fn generate_board(
    config: &EngineConfig,
    rng: &mut impl TokenSource,
) -> Result<GeneratedBoard, EngineError> {
    let mut attempts: u32 = 0;

    while attempts < config.max_generation_attempts {
        attempts += 1;

        let board = fill_random(config.rows, config.cols, config.token_kinds, rng);
        if !matcher::has_matches(&board, config.min_match) {
            debug!(attempts, "generated match-free board");
            return Ok(GeneratedBoard { board, attempts });
        }
    }

    error!(attempts, "board generation exhausted");
    Err(EngineError::GenerationExhausted { attempts })
}
