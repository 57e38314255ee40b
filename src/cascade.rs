//! Cascade resolution.
//!
//! A cascade is a loop of scan → clear → compact → refill that runs until a
//! scan finds nothing. [`CascadeRun`] exposes it one phase at a time so a UI
//! can animate between phases; [`resolve`] drives it to completion.

use serde::Serialize;
use tracing::{debug, error};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::rng::TokenSource;
use crate::types::{Board, Cell, Position};
use crate::{gravity, matcher, scoring};

/// Which boundary a snapshot was taken at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// Tokens exchanged, nothing removed yet.
    Swapped,
    Cleared,
    Compacted,
    Refilled,
}

/// Board state at one phase boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseSnapshot {
    pub phase: Phase,
    pub combo: u32,
    pub board: Board,
    /// Positions removed in this iteration (only set on `Cleared`).
    pub cleared: Vec<Position>,
    /// Points awarded in this iteration (only non-zero on `Cleared`).
    pub points: u64,
}

/// Totals for a finished cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeSummary {
    pub score_delta: u64,
    /// Highest combo level reached; the number of clearing iterations.
    pub final_combo: u32,
}

/// Result of a single [`CascadeRun::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeStep {
    Phase(PhaseSnapshot),
    Settled(CascadeSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Scan,
    Compact,
    Refill,
    Settled,
}

/// In-flight cascade. Holds the loop state; the board is passed in per step.
#[derive(Debug, Clone)]
pub struct CascadeRun {
    stage: Stage,
    combo: u32,
    score_delta: u64,
}

impl Default for CascadeRun {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeRun {
    pub fn new() -> Self {
        Self {
            stage: Stage::Scan,
            combo: 0,
            score_delta: 0,
        }
    }

    /// Current combo level (0 before the first clear).
    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn score_delta(&self) -> u64 {
        self.score_delta
    }

    pub fn is_settled(&self) -> bool {
        self.stage == Stage::Settled
    }

    fn summary(&self) -> CascadeSummary {
        CascadeSummary {
            score_delta: self.score_delta,
            final_combo: self.combo,
        }
    }

    fn snapshot(&self, phase: Phase, board: &Board) -> PhaseSnapshot {
        PhaseSnapshot {
            phase,
            combo: self.combo,
            board: board.clone(),
            cleared: Vec::new(),
            points: 0,
        }
    }

    /// Advance one phase, mutating `board` in place.
    ///
    /// Once settled, further calls keep returning the same summary.
    pub fn step(
        &mut self,
        board: &mut Board,
        config: &EngineConfig,
        rng: &mut impl TokenSource,
    ) -> Result<CascadeStep, EngineError> {
        match self.stage {
            Stage::Settled => Ok(CascadeStep::Settled(self.summary())),
            Stage::Scan => {
                let matched = matcher::find_matches(board, config.min_match);
                if matched.is_empty() {
                    self.stage = Stage::Settled;
                    return Ok(CascadeStep::Settled(self.summary()));
                }
                if self.combo >= config.max_cascade_iterations {
                    error!(iterations = self.combo, "cascade safety cap exceeded");
                    return Err(EngineError::SafetyCapExceeded {
                        iterations: self.combo,
                    });
                }

                self.combo += 1;
                let points = scoring::iteration_points(matched.len(), self.combo, config.points_per_tile);
                self.score_delta = self.score_delta.saturating_add(points);
                for &pos in &matched {
                    board.set(pos, Cell::Empty);
                }
                debug!(combo = self.combo, cleared = matched.len(), points, "cascade iteration");

                self.stage = Stage::Compact;
                let mut snap = self.snapshot(Phase::Cleared, board);
                snap.cleared = matched.into_iter().collect();
                snap.points = points;
                Ok(CascadeStep::Phase(snap))
            }
            Stage::Compact => {
                gravity::compact(board);
                self.stage = Stage::Refill;
                Ok(CascadeStep::Phase(self.snapshot(Phase::Compacted, board)))
            }
            Stage::Refill => {
                gravity::refill(board, config.token_kinds, rng);
                self.stage = Stage::Scan;
                Ok(CascadeStep::Phase(self.snapshot(Phase::Refilled, board)))
            }
        }
    }
}

/// A fully resolved cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeOutcome {
    pub board: Board,
    pub score_delta: u64,
    pub final_combo: u32,
    pub snapshots: Vec<PhaseSnapshot>,
}

/// Run a cascade on `board` to its fixpoint.
///
/// A board without matches comes back unchanged with a zero delta.
pub fn resolve(
    mut board: Board,
    config: &EngineConfig,
    rng: &mut impl TokenSource,
) -> Result<CascadeOutcome, EngineError> {
    let mut run = CascadeRun::new();
    let mut snapshots = Vec::new();
    loop {
        match run.step(&mut board, config, rng)? {
            CascadeStep::Phase(snap) => snapshots.push(snap),
            CascadeStep::Settled(summary) => {
                return Ok(CascadeOutcome {
                    board,
                    score_delta: summary.score_delta,
                    final_combo: summary.final_combo,
                    snapshots,
                });
            }
        }
    }
}
