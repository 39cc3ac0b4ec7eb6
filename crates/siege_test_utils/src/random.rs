//! Random sources with known output.

use siege_core::rng::RandomSource;

/// Replays a fixed list of draws.
///
/// Each draw is clamped into `[0, n)`. Once the list runs out the last value
/// repeats; an empty list always yields 0. Every requested bound is recorded
/// so tests can check how often and with what range the engine rolled.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    values: Vec<u32>,
    position: usize,
    requests: Vec<u32>,
}

impl ScriptedRandom {
    /// Replay `values` in order.
    #[must_use]
    pub fn new(values: impl Into<Vec<u32>>) -> Self {
        Self {
            values: values.into(),
            position: 0,
            requests: Vec::new(),
        }
    }

    /// Always roll 0.
    #[must_use]
    pub fn zeros() -> Self {
        Self::default()
    }

    /// Bounds passed to [`RandomSource::below`] so far.
    #[must_use]
    pub fn requests(&self) -> &[u32] {
        &self.requests
    }
}

impl RandomSource for ScriptedRandom {
    fn below(&mut self, n: u32) -> u32 {
        self.requests.push(n);
        if n == 0 {
            return 0;
        }
        let value = self
            .values
            .get(self.position)
            .or_else(|| self.values.last())
            .copied()
            .unwrap_or(0);
        self.position += 1;
        value.min(n - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_then_repeats_last() {
        let mut rng = ScriptedRandom::new([1, 4]);
        assert_eq!(rng.below(10), 1);
        assert_eq!(rng.below(10), 4);
        assert_eq!(rng.below(10), 4);
        assert_eq!(rng.requests(), &[10, 10, 10]);
    }

    #[test]
    fn test_clamps_into_range() {
        let mut rng = ScriptedRandom::new([9]);
        assert_eq!(rng.below(3), 2);
        assert_eq!(rng.below(0), 0);
        assert_eq!(ScriptedRandom::zeros().below(5), 0);
    }
}
