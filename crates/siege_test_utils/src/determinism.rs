//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a match produces identical results
//! given identical inputs.
//!
//! # Testing Strategy
//!
//! Matches must replay exactly from a seed and a command list. Sources of
//! non-determinism include:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Searches report results in discovery order and never iterate a map.
//!
//! - **Hidden randomness**: Every damage roll goes through
//!   [`siege_core::rng::RandomSource`]; a seeded or scripted source makes
//!   a run reproducible.
//!
//! - **Stale search state**: The search arena is reset before every query,
//!   so the order of earlier queries must not matter.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual searches and combat resolution
//! 2. **Property tests**: random boards must still give repeatable results
//! 3. **Integration tests**: scripted matches hash identically run to run

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use siege_core::game::Game;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps per run.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic match).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run agreed, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Match is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a scenario several times and compare final hashes.
///
/// `step` receives the step index so scripted command lists can be replayed.
///
/// # Example
///
/// ```
/// use siege_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(
///     3,
///     10,
///     || 0u64,
///     |state, step| *state += step,
///     |state| *state,
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for i in 0..steps {
            step(&mut state, i);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Run two copies of a match side by side, finding the first step after
/// which their saved states differ.
///
/// `None` if they never diverge, `Some(0)` if the setups already differ.
pub fn find_first_divergence<Setup, Step>(setup: Setup, step: Step, steps: u64) -> Option<u64>
where
    Setup: Fn() -> Game,
    Step: Fn(&mut Game, u64),
{
    let mut first = setup();
    let mut second = setup();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for i in 0..steps {
        step(&mut first, i);
        step(&mut second, i);

        if first.state_hash() != second.state_hash() {
            return Some(i + 1);
        }
    }

    None
}

/// Verify that saving and reloading a match preserves its state exactly.
pub fn verify_save_round_trip(game: &Game) -> bool {
    let save = game.save();
    let Ok(json) = save.to_json() else {
        return false;
    };
    let Ok(restored) = siege_core::persistence::SaveState::from_json(&json, "round-trip") else {
        return false;
    };
    let Ok(reloaded) = Game::from_save(
        std::sync::Arc::new(game.catalog().clone()),
        game.config().clone(),
        &restored,
    ) else {
        return false;
    };
    reloaded.state_hash() == game.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for boards, stats and rotations.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of the engine.
pub mod strategies {
    use proptest::prelude::*;
    use siege_core::grid::Cell;

    /// Map glyphs weighted towards open ground (see the fixture legend).
    pub fn arb_glyph() -> impl Strategy<Value = char> {
        prop_oneof![
            6 => Just('.'),
            2 => Just('f'),
            1 => Just('h'),
            1 => Just('w'),
        ]
    }

    /// An ASCII map of the given size.
    pub fn arb_map(width: usize, height: usize) -> impl Strategy<Value = Vec<String>> {
        proptest::collection::vec(
            proptest::collection::vec(arb_glyph(), width)
                .prop_map(|row| row.into_iter().collect::<String>()),
            height,
        )
    }

    /// A cell inside a `width` x `height` board.
    pub fn arb_cell(width: i32, height: i32) -> impl Strategy<Value = Cell> {
        (0..width, 0..height).prop_map(|(x, y)| Cell::new(x, y))
    }

    /// A movement budget.
    pub fn arb_budget() -> impl Strategy<Value = u32> {
        0u32..12
    }

    /// An attack or defense stat, including negative modifiers.
    pub fn arb_stat() -> impl Strategy<Value = i32> {
        -5i32..30
    }

    /// Current and maximum hitpoints with `current <= max`.
    pub fn arb_health() -> impl Strategy<Value = (u32, u32)> {
        (1u32..40).prop_flat_map(|max| (1..=max, Just(max)))
    }

    /// Number of seated players.
    pub fn arb_player_count() -> impl Strategy<Value = u8> {
        2u8..=4
    }
}
