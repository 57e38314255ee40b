//! Token sources.
//!
//! Uses the `rand` crate with `SmallRng` (xoshiro256++) which is fast and
//! works with WASM. Entropy is sourced from `getrandom` (browser crypto API).
//! Tests inject [`ScriptedTokens`] to get exact, repeatable boards.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::types::TokenType;

/// Supplies tokens for generation and refill.
pub trait TokenSource {
    /// Draw one token uniformly from `0..kinds`.
    fn next_token(&mut self, kinds: u8) -> TokenType;
}

/// A seedable RNG wrapper.
///
/// Can be seeded for deterministic replay, or created from system entropy.
#[derive(Debug, Clone)]
pub struct GameRng {
    inner: SmallRng,
}

impl GameRng {
    /// Create from system entropy (browser crypto.getRandomValues or OS).
    pub fn new() -> Self {
        Self {
            inner: SmallRng::from_os_rng(),
        }
    }

    /// Create with a specific seed for deterministic behavior.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: SmallRng::seed_from_u64(seed),
        }
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenSource for GameRng {
    #[inline(always)]
    fn next_token(&mut self, kinds: u8) -> TokenType {
        TokenType::new(self.inner.random_range(0..kinds))
    }
}

/// Replays a fixed script of token indices, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct ScriptedTokens {
    script: Vec<u8>,
    cursor: usize,
}

impl ScriptedTokens {
    pub fn new(script: impl Into<Vec<u8>>) -> Self {
        Self {
            script: script.into(),
            cursor: 0,
        }
    }

    /// Number of tokens drawn so far.
    pub fn drawn(&self) -> usize {
        self.cursor
    }
}

impl TokenSource for ScriptedTokens {
    fn next_token(&mut self, kinds: u8) -> TokenType {
        if self.script.is_empty() {
            return TokenType::new(0);
        }
        let kind = self.script[self.cursor % self.script.len()] % kinds;
        self.cursor += 1;
        TokenType::new(kind)
    }
}

impl<T: TokenSource + ?Sized> TokenSource for &mut T {
    fn next_token(&mut self, kinds: u8) -> TokenType {
        (**self).next_token(kinds)
    }
}
