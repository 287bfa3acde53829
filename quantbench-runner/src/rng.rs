//! Deterministic RNG hierarchy.
//!
//! A master seed generates deterministic sub-seeds for each `(stream, index)`
//! pair. Sub-seeds are derived via BLAKE3 hashing, independently of thread
//! scheduling order, so results are identical regardless of thread count.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    /// Fresh master seed from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive the sub-seed for `(stream, index)`.
    pub fn sub_seed(&self, stream: &str, index: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(stream.as_bytes());
        hasher.update(&index.to_le_bytes());
        let hash = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }

    pub fn rng_for(&self, stream: &str, index: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(stream, index))
    }
}
