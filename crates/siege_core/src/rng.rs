//! Injectable randomness.
//!
//! Combat draws every random number through [`RandomSource`], so a match can
//! run on a seeded generator in play and on a scripted one in tests.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Uniform integer source.
pub trait RandomSource {
    /// A value in `[0, n)`, or `0` when `n == 0`.
    fn below(&mut self, n: u32) -> u32;
}

/// Seeded generator for live play.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    /// Create a generator from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn below(&mut self, n: u32) -> u32 {
        if n == 0 {
            0
        } else {
            self.rng.gen_range(0..n)
        }
    }
}

/// Source that always returns the largest allowed value, `n - 1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxRandom;

impl RandomSource for MaxRandom {
    fn below(&mut self, n: u32) -> u32 {
        n.saturating_sub(1)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn below(&mut self, n: u32) -> u32 {
        (**self).below(n)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn below(&mut self, n: u32) -> u32 {
        (**self).below(n)
    }
}
