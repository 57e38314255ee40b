//! Engine error taxonomy.
//!
//! `EngineError` is returned as `Err` and aborts the operation. Benign gameplay
//! conditions are `RejectReason`s carried inside normal results and never
//! change session state.

use serde::Serialize;

use crate::types::Position;

/// Errors that abort an engine operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),

    #[error("no match-free board found after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },

    #[error("cascade did not settle within {iterations} iterations")]
    SafetyCapExceeded { iterations: u32 },

    #[error("board is {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    BoardShape {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("no cascade is pending")]
    NoCascadePending,
}

/// Why a swap or selection was turned away without touching the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "position", rename_all = "camelCase")]
pub enum RejectReason {
    InvalidPosition(Position),
    NotAdjacent,
    CascadeInProgress,
    GameOver,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::InvalidPosition(p) => write!(f, "position {p} is off the board"),
            RejectReason::NotAdjacent => f.write_str("cells are not orthogonal neighbours"),
            RejectReason::CascadeInProgress => f.write_str("a cascade is still resolving"),
            RejectReason::GameOver => f.write_str("no moves remain"),
        }
    }
}
