//! WebAssembly match-3 engine for Candy Match.
//!
//! Pure state-transition logic over a token grid: board generation without
//! pre-existing matches, swap validation, cascade resolution with gravity and
//! refill, and combo scoring. The UI only calls in and renders the results.
//!
//! Boards cross the JS boundary as flat row-major `Int8Array`s:
//! `cells[row * cols + col]`, with `-1` for a cell emptied mid-cascade.

pub mod board;
pub mod cascade;
pub mod config;
pub mod error;
pub mod gravity;
pub mod matcher;
pub mod rng;
pub mod scoring;
pub mod session;
pub mod types;

pub use cascade::{CascadeOutcome, CascadeRun, CascadeStep, CascadeSummary, Phase, PhaseSnapshot};
pub use config::EngineConfig;
pub use error::{EngineError, RejectReason};
pub use rng::{GameRng, ScriptedTokens, TokenSource};
pub use session::{Advance, MatchEngine, Selection, Session, SwapOutcome, SwapReport, SwapStart};
pub use types::{Board, Cell, Position, TokenType};

// ─── WASM Exports (only compiled for wasm32 target) ─────────────────────────

#[cfg(target_arch = "wasm32")]
mod wasm_exports {
    use serde::Serialize;
    use wasm_bindgen::prelude::*;

    use crate::config::EngineConfig;
    use crate::rng::GameRng;
    use crate::session::MatchEngine;
    use crate::types::Position;

    fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsError> {
        serde_wasm_bindgen::to_value(value).map_err(|e| JsError::new(&e.to_string()))
    }

    /// One game of Candy Match, seeded from browser entropy.
    #[wasm_bindgen(js_name = "MatchGame")]
    pub struct MatchGame {
        engine: MatchEngine<GameRng>,
    }

    #[wasm_bindgen(js_class = "MatchGame")]
    impl MatchGame {
        /// `config` is an optional partial `EngineConfig` object; missing fields take defaults.
        #[wasm_bindgen(constructor)]
        pub fn new(config: JsValue) -> Result<MatchGame, JsError> {
            let config: EngineConfig = if config.is_undefined() || config.is_null() {
                EngineConfig::default()
            } else {
                serde_wasm_bindgen::from_value(config).map_err(|e| JsError::new(&e.to_string()))?
            };
            let engine = MatchEngine::new(config, GameRng::new())?;
            Ok(MatchGame { engine })
        }

        /// Deal a new board and reset score, moves and combo. Returns the session.
        #[wasm_bindgen(js_name = "newGame")]
        pub fn new_game(&mut self) -> Result<JsValue, JsError> {
            let session = self.engine.new_game()?;
            to_js(session)
        }

        /// Current session: `{ board, score, movesRemaining, combo, terminal, selected, resolving }`.
        pub fn state(&self) -> Result<JsValue, JsError> {
            to_js(self.engine.session())
        }

        /// Click a cell. Returns `{ selection: "selected" | "cleared" | "swapped" | "ignored", ... }`.
        pub fn select(&mut self, row: usize, col: usize) -> Result<JsValue, JsError> {
            let selection = self.engine.select(Position::new(row, col))?;
            to_js(&selection)
        }

        /// Swap two cells and resolve the full cascade.
        /// Returns `{ kind: "accepted" | "reverted" | "rejected", ... }`.
        #[wasm_bindgen(js_name = "attemptSwap")]
        pub fn attempt_swap(
            &mut self,
            row_a: usize,
            col_a: usize,
            row_b: usize,
            col_b: usize,
        ) -> Result<JsValue, JsError> {
            let outcome = self
                .engine
                .attempt_swap(Position::new(row_a, col_a), Position::new(row_b, col_b))?;
            to_js(&outcome)
        }

        /// Swap two cells and leave the cascade pending for `advance()`.
        #[wasm_bindgen(js_name = "beginSwap")]
        pub fn begin_swap(
            &mut self,
            row_a: usize,
            col_a: usize,
            row_b: usize,
            col_b: usize,
        ) -> Result<JsValue, JsError> {
            let start = self
                .engine
                .begin_swap(Position::new(row_a, col_a), Position::new(row_b, col_b))?;
            to_js(&start)
        }

        /// Run one cascade phase. Returns `{ kind: "phase" | "settled", ... }`.
        pub fn advance(&mut self) -> Result<JsValue, JsError> {
            let step = self.engine.advance()?;
            to_js(&step)
        }

        /// Current board as flat row-major codes.
        #[wasm_bindgen(js_name = "boardCodes")]
        pub fn board_codes(&self) -> js_sys::Int8Array {
            let codes = self.engine.session().board().codes();
            let arr = js_sys::Int8Array::new_with_length(codes.len() as u32);
            arr.copy_from(&codes);
            arr
        }
    }

    /// Ping function to verify WASM is loaded.
    #[wasm_bindgen(js_name = "ping")]
    pub fn wasm_ping() -> String {
        "WASM match engine ready".to_string()
    }
}
