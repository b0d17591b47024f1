//! Random number generator abstraction for collapse runs.
//!
//! The driver never touches a global random source; every run owns an RNG
//! that implements `CollapseRng`:
//!
//! - `StdRandom`: wraps `rand::rngs::StdRng` (seeded or process-seeded)
//! - `SequenceRandom`: replays a fixed list of draws (reproduction and tests)
//!
//! # Example
//!
//! ```ignore
//! use collapse_core::rng::{CollapseRng, StdRandom};
//!
//! let mut rng = StdRandom::from_u64_seed(42);
//! let draw = rng.next_int_max(10); // 0..10
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform integer draws used by the collapse driver.
pub trait CollapseRng {
    /// Returns a uniform random integer in `[0, max)`.
    ///
    /// Returns 0 when `max` is 0.
    fn next_int_max(&mut self, max: u64) -> u64;

    /// Returns a uniform random index in `[0, max)`.
    fn next_usize_max(&mut self, max: usize) -> usize {
        self.next_int_max(max as u64) as usize
    }
}

/// Standard RNG wrapper using `rand::rngs::StdRng`.
#[derive(Debug, Clone)]
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    /// Create from a u64 seed. Same seed, same run.
    pub fn from_u64_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create from operating-system entropy (seeded once per run).
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded when `seed` is given, entropy-seeded otherwise.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::from_u64_seed(seed),
            None => Self::from_entropy(),
        }
    }
}

impl CollapseRng for StdRandom {
    fn next_int_max(&mut self, max: u64) -> u64 {
        if max == 0 {
            return 0;
        }
        self.rng.gen_range(0..max)
    }
}

/// Replays a fixed sequence of draws, cycling when exhausted.
///
/// Each draw is reduced modulo the requested bound, so a draw of `r` with
/// `r < max` is returned unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRandom {
    draws: Vec<u64>,
    cursor: usize,
}

impl SequenceRandom {
    pub fn new(draws: Vec<u64>) -> Self {
        Self { draws, cursor: 0 }
    }

    /// Number of draws consumed so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl CollapseRng for SequenceRandom {
    fn next_int_max(&mut self, max: u64) -> u64 {
        if max == 0 || self.draws.is_empty() {
            return 0;
        }
        let draw = self.draws[self.cursor % self.draws.len()];
        self.cursor += 1;
        draw % max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_random_bounds() {
        let mut rng = StdRandom::from_u64_seed(42);
        for _ in 0..200 {
            let v = rng.next_int_max(7);
            assert!(v < 7);
        }
        assert_eq!(rng.next_int_max(0), 0);
    }

    #[test]
    fn test_std_random_is_deterministic() {
        let mut rng1 = StdRandom::from_u64_seed(123);
        let mut rng2 = StdRandom::from_u64_seed(123);
        for _ in 0..100 {
            assert_eq!(rng1.next_int_max(1000), rng2.next_int_max(1000));
        }
    }

    #[test]
    fn test_clone_continues_same_stream() {
        let mut rng = StdRandom::from_u64_seed(9);
        rng.next_int_max(100);
        let mut fork = rng.clone();
        for _ in 0..20 {
            assert_eq!(rng.next_usize_max(50), fork.next_usize_max(50));
        }
    }

    #[test]
    fn test_sequence_random_replays_and_cycles() {
        let mut rng = SequenceRandom::new(vec![0, 3, 5]);
        assert_eq!(rng.next_int_max(4), 0);
        assert_eq!(rng.next_int_max(4), 3);
        assert_eq!(rng.next_int_max(4), 1); // 5 % 4
        assert_eq!(rng.next_int_max(10), 0); // cycled
        assert_eq!(rng.consumed(), 4);
    }

    #[test]
    fn test_sequence_random_empty() {
        let mut rng = SequenceRandom::new(Vec::new());
        assert_eq!(rng.next_int_max(10), 0);
        assert_eq!(rng.consumed(), 0);
    }
}
