// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Deterministic sub-seeding.
//!
//! Every random draw of a run comes from a generator seeded by a pure function of
//! the run seed, a stream tag and the coordinates of the work item. Results are
//! therefore identical regardless of thread count or scheduling order.

use rand::SeedableRng;
use rand::rngs::StdRng;

const GOLDEN_GAMMA: u64 = 0x9e3779b97f4a7c15;

/// Independent random streams used by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum Stream {
    WildIntervals = 1,
    Permutation = 2,
    Forest = 3,
}

#[inline]
fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// Folds `(seed, stream, start, stop, index)` into a well-mixed 64-bit seed.
pub fn derive_seed(seed: u64, stream: Stream, start: usize, stop: usize, index: u64) -> u64 {
    let mut state = seed.wrapping_add(GOLDEN_GAMMA);
    for word in [stream as u64, start as u64, stop as u64, index] {
        state = mix64(state.wrapping_add(GOLDEN_GAMMA) ^ word);
    }
    state
}

/// A generator seeded with [`derive_seed`].
pub fn rng_for(seed: u64, stream: Stream, start: usize, stop: usize, index: u64) -> StdRng {
    StdRng::seed_from_u64(derive_seed(seed, stream, start, stop, index))
}
