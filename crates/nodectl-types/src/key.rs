// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Splittable PRNG Key
// ─────────────────────────────────────────────────────────────────────
//! Deterministic, splittable random key.
//!
//! A key is an immutable seed. `split` derives independent child keys
//! without touching the parent, so sub-networks initialised from
//! sibling keys are uncorrelated and reproducible.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrngKey(u64);

impl PrngKey {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn seed(self) -> u64 {
        self.0
    }

    /// Two independent children.
    pub fn split(self) -> (PrngKey, PrngKey) {
        let mut rng = self.rng();
        (PrngKey(rng.next_u64()), PrngKey(rng.next_u64()))
    }

    /// `n` independent children.
    pub fn split_n(self, n: usize) -> Vec<PrngKey> {
        let mut rng = self.rng();
        (0..n).map(|_| PrngKey(rng.next_u64())).collect()
    }

    /// Generator seeded from this key.
    pub fn rng(self) -> StdRng {
        StdRng::seed_from_u64(self.0)
    }
}

impl Default for PrngKey {
    fn default() -> Self {
        Self::new(1)
    }
}
