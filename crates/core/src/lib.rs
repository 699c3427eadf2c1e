#![warn(missing_docs)]
//! Core primitives shared across the workspace.

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Frame counter driving the streaming loop (one `update` per frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameTick(pub u64);

impl FrameTick {
    /// First frame in any deterministic timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` frames.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }
}

/// Opaque identifier handed out by an external entity owner.
///
/// Chunks retain these for the enemies they spawned so the owner can be told
/// which entities belong to a chunk when it unloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityHandle(pub u64);

/// Helper to derive a reproducible RNG scoped to a world seed and a chunk.
pub fn scoped_rng(world_seed: u64, chunk_hash: u64) -> StdRng {
    StdRng::seed_from_u64(world_seed ^ chunk_hash)
}
