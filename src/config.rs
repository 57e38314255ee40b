//! Engine parameters.
//!
//! Every constant of the game lives here rather than in the engine so the
//! UI can pass a partial object and take defaults for the rest.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Largest alphabet a token code can carry across the `Int8Array` boundary.
pub const MAX_TOKEN_KINDS: u8 = 64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub rows: usize,
    pub cols: usize,
    /// Alphabet size K.
    pub token_kinds: u8,
    /// Minimum run length M that counts as a match.
    pub min_match: usize,
    pub starting_moves: u32,
    /// Points per removed tile per combo level.
    pub points_per_tile: u32,
    /// Cap on whole-board regenerations before giving up.
    pub max_generation_attempts: u32,
    /// Cap on clear/compact/refill iterations within one cascade.
    pub max_cascade_iterations: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rows: 8,
            cols: 8,
            token_kinds: 6,
            min_match: 3,
            starting_moves: 30,
            points_per_tile: 10,
            max_generation_attempts: 1000,
            max_cascade_iterations: 1000,
        }
    }
}

impl EngineConfig {
    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        let fail = |msg: String| Err(EngineError::InvalidConfig(msg));

        if self.min_match < 2 {
            return fail(format!("minMatch must be >= 2, got {}", self.min_match));
        }
        if self.rows < self.min_match || self.cols < self.min_match {
            return fail(format!(
                "board {}x{} is smaller than minMatch {}",
                self.rows, self.cols, self.min_match
            ));
        }
        if self.token_kinds < 2 || self.token_kinds > MAX_TOKEN_KINDS {
            return fail(format!(
                "tokenKinds must be in 2..={MAX_TOKEN_KINDS}, got {}",
                self.token_kinds
            ));
        }
        if self.starting_moves == 0 {
            return fail("startingMoves must be >= 1".to_string());
        }
        if self.max_generation_attempts == 0 {
            return fail("maxGenerationAttempts must be >= 1".to_string());
        }
        if self.max_cascade_iterations == 0 {
            return fail("maxCascadeIterations must be >= 1".to_string());
        }
        Ok(())
    }
}
