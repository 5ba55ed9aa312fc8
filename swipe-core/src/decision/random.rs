use std::sync::{Mutex, PoisonError};

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use super::error::{DecisionError, DecisionResult};

/// Source of uniform integer draws for weighted policies.
///
/// Any [`rand::RngCore`] qualifies; tests substitute scripted sequences.
pub trait RandomSource: Send {
    /// Uniform draw from `0..upper`. `upper` is never zero.
    fn below(&mut self, upper: u32) -> u32;
}

impl<R: RngCore + Send> RandomSource for R {
    fn below(&mut self, upper: u32) -> u32 {
        self.gen_range(0..upper)
    }
}

/// Deterministic when `seed` is set, seeded from OS entropy otherwise.
pub fn seeded_source(seed: Option<u64>) -> Box<dyn RandomSource> {
    match seed {
        Some(seed) => Box::new(ChaCha20Rng::seed_from_u64(seed)),
        None => Box::new(ChaCha20Rng::from_entropy()),
    }
}

/// A validated like:pass ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikePassWeights {
    like: u32,
    pass: u32,
}

impl LikePassWeights {
    pub fn new(label: &'static str, like: u32, pass: u32) -> DecisionResult<Self> {
        let invalid = || DecisionError::InvalidWeights { label, like, pass };
        if like == 0 || pass == 0 {
            return Err(invalid());
        }
        like.checked_add(pass).ok_or_else(invalid)?;
        Ok(Self { like, pass })
    }

    pub fn like(&self) -> u32 {
        self.like
    }

    pub fn pass(&self) -> u32 {
        self.pass
    }

    pub fn total(&self) -> u32 {
        self.like + self.pass
    }

    pub fn like_probability(&self) -> f64 {
        f64::from(self.like) / f64::from(self.total())
    }
}

/// A random source behind its own lock, held for exactly one draw.
pub struct LockedRandom {
    source: Mutex<Box<dyn RandomSource>>,
}

impl LockedRandom {
    pub fn new(source: Box<dyn RandomSource>) -> Self {
        Self {
            source: Mutex::new(source),
        }
    }

    /// Rolls in `0..total` and reports whether the roll lands in the like band.
    pub fn draw_like(&self, weights: LikePassWeights) -> bool {
        let roll = {
            let mut source = self.source.lock().unwrap_or_else(PoisonError::into_inner);
            source.below(weights.total())
        };
        roll < weights.like()
    }
}

impl std::fmt::Debug for LockedRandom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockedRandom").finish_non_exhaustive()
    }
}
