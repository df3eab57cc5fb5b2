//! Injectable source of randomness for the pet engine.

use rand::Rng;

/// Random draws consumed by the engine. Implementations must be shareable
/// across request tasks and the tick scheduler.
pub trait RandomSource: Send + Sync {
    /// Return `true` with the given probability (clamped to `[0, 1]`).
    fn chance(&self, probability: f64) -> bool;
    /// Pick a cosmetic hue rotation in `[-180, 180)`.
    fn hue(&self) -> i32;
}

/// Production randomness backed by the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn chance(&self, probability: f64) -> bool {
        rand::rng().random_bool(probability.clamp(0.0, 1.0))
    }

    fn hue(&self) -> i32 {
        rand::rng().random_range(-180..180)
    }
}

#[cfg(test)]
pub use self::testing::{ScriptedRandom, SeededRandom};

#[cfg(test)]
mod testing {
    use std::{collections::VecDeque, sync::Mutex};

    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::RandomSource;

    /// Replays a fixed sequence of outcomes; once exhausted every draw fails.
    #[derive(Debug, Default)]
    pub struct ScriptedRandom {
        outcomes: Mutex<VecDeque<bool>>,
    }

    impl ScriptedRandom {
        pub fn new(outcomes: impl IntoIterator<Item = bool>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into_iter().collect()),
            }
        }

        pub fn never() -> Self {
            Self::default()
        }

        pub fn push(&self, outcome: bool) {
            self.outcomes.lock().unwrap().push_back(outcome);
        }
    }

    impl RandomSource for ScriptedRandom {
        fn chance(&self, _probability: f64) -> bool {
            self.outcomes.lock().unwrap().pop_front().unwrap_or(false)
        }

        fn hue(&self) -> i32 {
            0
        }
    }

    /// Reproducible pseudo-random source for long randomized sequences.
    pub struct SeededRandom {
        rng: Mutex<StdRng>,
    }

    impl SeededRandom {
        pub fn new(seed: u64) -> Self {
            Self {
                rng: Mutex::new(StdRng::seed_from_u64(seed)),
            }
        }

        pub fn below(&self, bound: usize) -> usize {
            self.rng.lock().unwrap().random_range(0..bound)
        }
    }

    impl RandomSource for SeededRandom {
        fn chance(&self, probability: f64) -> bool {
            self.rng
                .lock()
                .unwrap()
                .random_bool(probability.clamp(0.0, 1.0))
        }

        fn hue(&self) -> i32 {
            self.rng.lock().unwrap().random_range(-180..180)
        }
    }
}
