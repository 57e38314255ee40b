//! Game session and the engine that drives it.
//!
//! [`MatchEngine`] owns the only mutable game state: one [`Session`] plus the
//! token source and config. Every mutating call goes through `&mut self`, so
//! a host sharing the engine across tasks must serialize access itself.

use serde::{Serialize, Serializer};
use tracing::{debug, info, instrument, warn};

use crate::board;
use crate::cascade::{CascadeRun, CascadeStep, Phase, PhaseSnapshot};
use crate::config::EngineConfig;
use crate::error::{EngineError, RejectReason};
use crate::matcher;
use crate::rng::{GameRng, TokenSource};
use crate::types::{Board, Position};

/// A cascade that has been triggered but not yet fully stepped through.
#[derive(Debug, Clone)]
struct PendingCascade {
    run: CascadeRun,
    snapshots: Vec<PhaseSnapshot>,
}

fn serialize_pending<S: Serializer>(
    pending: &Option<PendingCascade>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_bool(pending.is_some())
}

/// Caller-visible game state for one game.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    board: Board,
    score: u64,
    moves_remaining: u32,
    /// Combo level of the cascade in progress; 0 between cascades.
    combo: u32,
    terminal: bool,
    selected: Option<Position>,
    #[serde(rename = "resolving", serialize_with = "serialize_pending")]
    pending: Option<PendingCascade>,
}

impl Session {
    fn start(board: Board, config: &EngineConfig) -> Self {
        Self {
            board,
            score: 0,
            moves_remaining: config.starting_moves,
            combo: 0,
            terminal: false,
            selected: None,
            pending: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn moves_remaining(&self) -> u32 {
        self.moves_remaining
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn selected(&self) -> Option<Position> {
        self.selected
    }

    /// True while an accepted swap's cascade has not been stepped to completion.
    pub fn is_resolving(&self) -> bool {
        self.pending.is_some()
    }
}

/// Everything that happened during one accepted swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapReport {
    /// `Swapped` first, then `Cleared`/`Compacted`/`Refilled` per iteration.
    pub snapshots: Vec<PhaseSnapshot>,
    pub score_delta: u64,
    pub final_combo: u32,
    pub moves_remaining: u32,
    pub is_terminal: bool,
}

impl SwapReport {
    /// Board after the cascade settled.
    pub fn final_board(&self) -> Option<&Board> {
        self.snapshots.last().map(|s| &s.board)
    }
}

/// Result of [`MatchEngine::attempt_swap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SwapOutcome {
    Accepted(SwapReport),
    /// Adjacent swap that made no match; the exchange was undone.
    Reverted,
    Rejected(RejectReason),
}

impl SwapOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SwapOutcome::Accepted(_))
    }
}

/// Result of [`MatchEngine::begin_swap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SwapStart {
    /// Swap accepted; the `Swapped` snapshot is returned and a cascade is pending.
    Started(PhaseSnapshot),
    Reverted,
    Rejected(RejectReason),
}

/// Result of [`MatchEngine::advance`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Advance {
    Phase(PhaseSnapshot),
    Settled(SwapReport),
}

/// Result of [`MatchEngine::select`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "selection", rename_all = "camelCase")]
pub enum Selection {
    Selected(Position),
    /// The selected cell was clicked again.
    Cleared,
    /// The click completed a swap with the previously selected neighbour.
    Swapped(SwapOutcome),
    Ignored(RejectReason),
}

/// The match-3 engine.
#[derive(Debug, Clone)]
pub struct MatchEngine<R: TokenSource = GameRng> {
    config: EngineConfig,
    rng: R,
    session: Session,
}

impl<R: TokenSource> MatchEngine<R> {
    /// Validate `config` and start a first game with a freshly generated board.
    pub fn new(config: EngineConfig, mut rng: R) -> Result<Self, EngineError> {
        config.validate()?;
        let generated = board::generate_board(&config, &mut rng)?;
        let session = Session::start(generated.board, &config);
        Ok(Self { config, rng, session })
    }

    /// Start from a caller-supplied board instead of a generated one.
    ///
    /// The board must match the configured shape, use only tokens from the
    /// configured alphabet and contain no match.
    pub fn with_board(config: EngineConfig, rng: R, board: Board) -> Result<Self, EngineError> {
        config.validate()?;
        if board.rows() != config.rows || board.cols() != config.cols {
            return Err(EngineError::BoardShape {
                expected_rows: config.rows,
                expected_cols: config.cols,
                rows: board.rows(),
                cols: board.cols(),
            });
        }
        if let Some(kind) = board
            .cells()
            .iter()
            .filter_map(|c| c.token())
            .find(|t| t.index() >= config.token_kinds)
        {
            return Err(EngineError::InvalidConfig(format!(
                "token {} is outside an alphabet of {}",
                kind.index(),
                config.token_kinds
            )));
        }
        if board.empty_count() > 0 || matcher::has_matches(&board, config.min_match) {
            return Err(EngineError::InvalidConfig(
                "starting board must be full and free of matches".to_string(),
            ));
        }
        let session = Session::start(board, &config);
        Ok(Self { config, rng, session })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Discard the current session (including any pending cascade) and deal a new board.
    ///
    /// On failure the previous session is left in place.
    #[instrument(skip(self))]
    pub fn new_game(&mut self) -> Result<&Session, EngineError> {
        let generated = board::generate_board(&self.config, &mut self.rng)?;
        self.session = Session::start(generated.board, &self.config);
        info!(attempts = generated.attempts, moves = self.config.starting_moves, "new game");
        Ok(&self.session)
    }

    fn swap_blocker(&self, a: Position, b: Position) -> Option<RejectReason> {
        if self.session.pending.is_some() {
            return Some(RejectReason::CascadeInProgress);
        }
        if self.session.terminal || self.session.moves_remaining == 0 {
            return Some(RejectReason::GameOver);
        }
        for pos in [a, b] {
            if !self.session.board.in_bounds(pos) {
                return Some(RejectReason::InvalidPosition(pos));
            }
        }
        if !a.is_adjacent(b) {
            return Some(RejectReason::NotAdjacent);
        }
        None
    }

    /// Validate and apply a swap, leaving the resulting cascade pending.
    ///
    /// Any selection is cleared once the pair has been evaluated, including a
    /// non-adjacent pair. Drive the cascade with [`advance`](Self::advance).
    #[instrument(skip(self))]
    pub fn begin_swap(&mut self, a: Position, b: Position) -> Result<SwapStart, EngineError> {
        if let Some(reason) = self.swap_blocker(a, b) {
            if reason == RejectReason::NotAdjacent {
                self.session.selected = None;
            }
            warn!(%reason, "swap rejected");
            return Ok(SwapStart::Rejected(reason));
        }

        let session = &mut self.session;
        session.selected = None;
        session.board.swap(a, b);
        if !matcher::has_matches(&session.board, self.config.min_match) {
            session.board.swap(a, b);
            debug!("swap made no match, reverted");
            return Ok(SwapStart::Reverted);
        }

        session.moves_remaining -= 1;
        session.combo = 0;
        let snapshot = PhaseSnapshot {
            phase: Phase::Swapped,
            combo: 0,
            board: session.board.clone(),
            cleared: Vec::new(),
            points: 0,
        };
        session.pending = Some(PendingCascade {
            run: CascadeRun::new(),
            snapshots: vec![snapshot.clone()],
        });
        Ok(SwapStart::Started(snapshot))
    }

    /// Run exactly one phase of the pending cascade.
    ///
    /// Score and combo are applied at each `Cleared` phase. A fatal error
    /// leaves the session unusable until [`new_game`](Self::new_game).
    pub fn advance(&mut self) -> Result<Advance, EngineError> {
        let session = &mut self.session;
        let pending = session.pending.as_mut().ok_or(EngineError::NoCascadePending)?;

        match pending.run.step(&mut session.board, &self.config, &mut self.rng)? {
            CascadeStep::Phase(snapshot) => {
                if snapshot.phase == Phase::Cleared {
                    session.score = session.score.saturating_add(snapshot.points);
                    session.combo = pending.run.combo();
                }
                pending.snapshots.push(snapshot.clone());
                Ok(Advance::Phase(snapshot))
            }
            CascadeStep::Settled(summary) => {
                let snapshots = session
                    .pending
                    .take()
                    .map(|p| p.snapshots)
                    .unwrap_or_default();
                session.combo = 0;
                if session.moves_remaining == 0 {
                    session.terminal = true;
                    info!(score = session.score, "game over");
                }
                info!(
                    score_delta = summary.score_delta,
                    final_combo = summary.final_combo,
                    moves_remaining = session.moves_remaining,
                    "cascade settled"
                );
                Ok(Advance::Settled(SwapReport {
                    snapshots,
                    score_delta: summary.score_delta,
                    final_combo: summary.final_combo,
                    moves_remaining: session.moves_remaining,
                    is_terminal: session.terminal,
                }))
            }
        }
    }

    /// Swap two cells and resolve the whole cascade synchronously.
    pub fn attempt_swap(&mut self, a: Position, b: Position) -> Result<SwapOutcome, EngineError> {
        match self.begin_swap(a, b)? {
            SwapStart::Started(_) => loop {
                if let Advance::Settled(report) = self.advance()? {
                    return Ok(SwapOutcome::Accepted(report));
                }
            },
            SwapStart::Reverted => Ok(SwapOutcome::Reverted),
            SwapStart::Rejected(reason) => Ok(SwapOutcome::Rejected(reason)),
        }
    }

    /// Click-style selection: pick a cell, toggle it off, or complete a swap
    /// with the selected neighbour.
    #[instrument(skip(self))]
    pub fn select(&mut self, pos: Position) -> Result<Selection, EngineError> {
        if self.session.pending.is_some() {
            return Ok(Selection::Ignored(RejectReason::CascadeInProgress));
        }
        if self.session.terminal {
            return Ok(Selection::Ignored(RejectReason::GameOver));
        }
        if !self.session.board.in_bounds(pos) {
            return Ok(Selection::Ignored(RejectReason::InvalidPosition(pos)));
        }

        match self.session.selected {
            None => {
                self.session.selected = Some(pos);
                Ok(Selection::Selected(pos))
            }
            Some(current) if current == pos => {
                self.session.selected = None;
                Ok(Selection::Cleared)
            }
            Some(current) if current.is_adjacent(pos) => {
                self.session.selected = None;
                Ok(Selection::Swapped(self.attempt_swap(current, pos)?))
            }
            Some(_) => {
                self.session.selected = Some(pos);
                Ok(Selection::Selected(pos))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedTokens;

    fn p(row: usize, col: usize) -> Position {
        Position::new(row, col)
    }

    /// Swapping (0,2)<->(1,2) turns row 0 into 2,2,2,0.
    fn fixture() -> Board {
        Board::from_rows(&[&[2, 2, 1, 0], &[1, 0, 2, 1], &[0, 1, 0, 3], &[1, 0, 1, 0]]).unwrap()
    }

    fn engine(script: Vec<u8>, moves: u32) -> MatchEngine<ScriptedTokens> {
        let cfg = EngineConfig { rows: 4, cols: 4, starting_moves: moves, ..Default::default() };
        MatchEngine::with_board(cfg, ScriptedTokens::new(script), fixture()).unwrap()
    }

    #[test]
    fn test_with_board_rejects_matching_board() {
        let cfg = EngineConfig { rows: 3, cols: 3, ..Default::default() };
        let board = Board::from_rows(&[&[1, 1, 1], &[0, 2, 0], &[2, 0, 2]]).unwrap();
        let err = MatchEngine::with_board(cfg, ScriptedTokens::new(vec![]), board).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn test_with_board_rejects_tokens_outside_alphabet() {
        let cfg = EngineConfig { rows: 3, cols: 3, token_kinds: 6, ..Default::default() };
        let board = Board::from_rows(&[&[255, 6, 200], &[6, 200, 255], &[200, 255, 6]]).unwrap();
        let err = MatchEngine::with_board(cfg, ScriptedTokens::new(vec![]), board).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn test_with_board_rejects_wrong_shape() {
        let cfg = EngineConfig::default();
        let err = MatchEngine::with_board(cfg, ScriptedTokens::new(vec![]), fixture()).unwrap_err();
        assert!(matches!(err, EngineError::BoardShape { rows: 4, .. }));
    }

    #[test]
    fn test_accepted_swap_scores_and_spends_move() {
        let mut e = engine(vec![3, 4, 5], 10);
        let out = e.attempt_swap(p(0, 2), p(1, 2)).unwrap();
        let SwapOutcome::Accepted(report) = out else {
            panic!("expected accepted swap, got {out:?}");
        };
        assert_eq!(report.score_delta, 30);
        assert_eq!(report.final_combo, 1);
        assert_eq!(report.moves_remaining, 9);
        assert!(!report.is_terminal);
        assert_eq!(report.snapshots[0].phase, Phase::Swapped);
        assert_eq!(report.final_board(), Some(e.session().board()));
        assert_eq!(e.session().score(), 30);
        assert_eq!(e.session().combo(), 0);
        assert!(!matcher::has_matches(e.session().board(), 3));
    }

    #[test]
    fn test_no_match_swap_reverts() {
        let mut e = engine(vec![], 10);
        let before = e.session().clone();
        let out = e.attempt_swap(p(2, 0), p(3, 0)).unwrap();
        assert_eq!(out, SwapOutcome::Reverted);
        assert_eq!(e.session().board(), before.board());
        assert_eq!(e.session().moves_remaining(), 10);
        assert_eq!(e.session().score(), 0);
    }

    #[test]
    fn test_rejections_leave_state_alone() {
        let mut e = engine(vec![], 10);
        let before = e.session().board().clone();
        assert_eq!(
            e.attempt_swap(p(0, 0), p(2, 0)).unwrap(),
            SwapOutcome::Rejected(RejectReason::NotAdjacent)
        );
        assert_eq!(
            e.attempt_swap(p(0, 0), p(1, 1)).unwrap(),
            SwapOutcome::Rejected(RejectReason::NotAdjacent)
        );
        assert_eq!(
            e.attempt_swap(p(3, 3), p(4, 3)).unwrap(),
            SwapOutcome::Rejected(RejectReason::InvalidPosition(p(4, 3)))
        );
        assert_eq!(e.session().board(), &before);
        assert_eq!(e.session().moves_remaining(), 10);
    }

    #[test]
    fn test_last_move_ends_game() {
        let mut e = engine(vec![3, 4, 5], 1);
        let out = e.attempt_swap(p(0, 2), p(1, 2)).unwrap();
        assert!(matches!(out, SwapOutcome::Accepted(ref r) if r.is_terminal && r.moves_remaining == 0));
        assert!(e.session().is_terminal());
        assert_eq!(
            e.attempt_swap(p(0, 0), p(0, 1)).unwrap(),
            SwapOutcome::Rejected(RejectReason::GameOver)
        );
        assert_eq!(e.select(p(0, 0)).unwrap(), Selection::Ignored(RejectReason::GameOver));

        e.new_game().unwrap();
        assert!(!e.session().is_terminal());
        assert_eq!(e.session().moves_remaining(), 1);
        assert_eq!(e.session().score(), 0);
    }

    #[test]
    fn test_stepwise_blocks_new_swaps() {
        let mut e = engine(vec![3, 4, 5], 10);
        assert!(matches!(e.begin_swap(p(0, 2), p(1, 2)).unwrap(), SwapStart::Started(_)));
        assert!(e.session().is_resolving());
        assert_eq!(e.session().moves_remaining(), 9);

        assert_eq!(
            e.attempt_swap(p(2, 0), p(3, 0)).unwrap(),
            SwapOutcome::Rejected(RejectReason::CascadeInProgress)
        );
        assert_eq!(e.select(p(0, 0)).unwrap(), Selection::Ignored(RejectReason::CascadeInProgress));

        let Advance::Phase(cleared) = e.advance().unwrap() else {
            panic!("expected a phase");
        };
        assert_eq!(cleared.phase, Phase::Cleared);
        assert_eq!(e.session().score(), 30);
        assert_eq!(e.session().combo(), 1);
        assert_eq!(e.session().board().empty_count(), 3);

        assert!(matches!(e.advance().unwrap(), Advance::Phase(ref s) if s.phase == Phase::Compacted));
        assert!(matches!(e.advance().unwrap(), Advance::Phase(ref s) if s.phase == Phase::Refilled));
        let Advance::Settled(report) = e.advance().unwrap() else {
            panic!("expected settle");
        };
        assert_eq!(report.snapshots.len(), 4);
        assert!(!e.session().is_resolving());
        assert_eq!(e.session().combo(), 0);
        assert_eq!(e.advance().unwrap_err(), EngineError::NoCascadePending);
    }

    #[test]
    fn test_selection_flow() {
        let mut e = engine(vec![3, 4, 5], 10);
        assert_eq!(e.select(p(0, 2)).unwrap(), Selection::Selected(p(0, 2)));
        assert_eq!(e.select(p(0, 2)).unwrap(), Selection::Cleared);
        assert_eq!(e.session().selected(), None);

        e.select(p(0, 2)).unwrap();
        // Not a neighbour: selection moves, nothing else changes.
        assert_eq!(e.select(p(3, 3)).unwrap(), Selection::Selected(p(3, 3)));
        assert_eq!(e.session().moves_remaining(), 10);

        e.select(p(0, 2)).unwrap();
        let out = e.select(p(1, 2)).unwrap();
        assert!(matches!(out, Selection::Swapped(SwapOutcome::Accepted(_))));
        assert_eq!(e.session().selected(), None);
        assert_eq!(e.session().score(), 30);

        assert_eq!(
            e.select(p(9, 9)).unwrap(),
            Selection::Ignored(RejectReason::InvalidPosition(p(9, 9)))
        );
    }

    #[test]
    fn test_session_serializes_resolving_flag() {
        let mut e = engine(vec![3, 4, 5], 10);
        e.begin_swap(p(0, 2), p(1, 2)).unwrap();
        let json = serde_json::to_value(e.session()).unwrap();
        assert_eq!(json["resolving"], true);
        assert_eq!(json["movesRemaining"], 9);
        assert_eq!(json["board"]["rows"], 4);
    }

    #[test]
    fn test_new_game_generates_clean_board() {
        let cfg = EngineConfig::default();
        let mut e = MatchEngine::new(cfg, GameRng::from_seed(7)).unwrap();
        for _ in 0..5 {
            let s = e.new_game().unwrap();
            assert!(!matcher::has_matches(s.board(), 3));
            assert_eq!(s.moves_remaining(), 30);
            assert_eq!(s.combo(), 0);
        }
    }

    #[test]
    fn test_new_game_discards_pending_cascade() {
        let mut e = engine(vec![3, 4, 5], 10);
        e.begin_swap(p(0, 2), p(1, 2)).unwrap();
        e.advance().unwrap();
        assert!(e.session().is_resolving());
        assert_eq!(e.session().score(), 30);

        e.new_game().unwrap();
        assert!(!e.session().is_resolving());
        assert_eq!(e.session().moves_remaining(), e.config().starting_moves);
        assert_eq!(e.session().score(), 0);
        assert_eq!(e.session().combo(), 0);
        assert_eq!(e.advance().unwrap_err(), EngineError::NoCascadePending);
    }

    #[test]
    fn test_cascade_cap_locks_session_until_new_game() {
        // Refill redraws 2,2,2 into row 0, rebuilding the match; the next 16
        // draws deal a checkerboard for the recovery game.
        let mut script = vec![2, 2, 2];
        script.extend([0, 1, 0, 1, 1, 0, 1, 0, 0, 1, 0, 1, 1, 0, 1, 0]);
        let cfg = EngineConfig { rows: 4, cols: 4, max_cascade_iterations: 1, ..Default::default() };
        let mut e = MatchEngine::with_board(cfg, ScriptedTokens::new(script), fixture()).unwrap();

        assert!(matches!(e.begin_swap(p(0, 2), p(1, 2)).unwrap(), SwapStart::Started(_)));
        for phase in [Phase::Cleared, Phase::Compacted, Phase::Refilled] {
            assert!(matches!(e.advance().unwrap(), Advance::Phase(ref s) if s.phase == phase));
        }
        assert_eq!(e.session().board().codes()[..4], [2, 2, 2, 0]);
        assert_eq!(e.advance().unwrap_err(), EngineError::SafetyCapExceeded { iterations: 1 });

        assert!(e.session().is_resolving());
        assert_eq!(
            e.attempt_swap(p(2, 0), p(3, 0)).unwrap(),
            SwapOutcome::Rejected(RejectReason::CascadeInProgress)
        );
        assert_eq!(e.select(p(2, 0)).unwrap(), Selection::Ignored(RejectReason::CascadeInProgress));

        e.new_game().unwrap();
        assert!(!e.session().is_resolving());
        assert_eq!(e.session().board().codes()[..4], [0, 1, 0, 1]);
        assert_eq!(e.session().moves_remaining(), 30);
        assert_eq!(e.attempt_swap(p(0, 0), p(0, 1)).unwrap(), SwapOutcome::Reverted);
    }

    #[test]
    fn test_direct_swap_clears_selection() {
        let mut e = engine(vec![3, 4, 5], 10);
        e.select(p(3, 3)).unwrap();
        assert_eq!(
            e.attempt_swap(p(0, 0), p(2, 0)).unwrap(),
            SwapOutcome::Rejected(RejectReason::NotAdjacent)
        );
        assert_eq!(e.session().selected(), None);

        e.select(p(3, 3)).unwrap();
        assert_eq!(
            e.attempt_swap(p(3, 3), p(4, 3)).unwrap(),
            SwapOutcome::Rejected(RejectReason::InvalidPosition(p(4, 3)))
        );
        assert_eq!(e.session().selected(), Some(p(3, 3)));

        let out = e.attempt_swap(p(0, 2), p(1, 2)).unwrap();
        assert!(out.is_accepted());
        assert_eq!(e.session().selected(), None);
    }
}
