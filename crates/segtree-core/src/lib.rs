// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Core shared types for segtree: the input data view, run hyperparameters,
//! errors, deterministic seeding and run diagnostics.

pub mod control;
pub mod diagnostics;
pub mod error;
pub mod raw_data;
pub mod seeding;

pub use control::{
    Control, DEFAULT_MODEL_SELECTION_N_PERMUTATIONS, MaxFeatures, RandomForestParameters,
    ResolvedControl, default_minimal_gain_to_split,
};
pub use diagnostics::{DIAGNOSTICS_SCHEMA_VERSION, Diagnostics};
pub use error::SegError;
pub use raw_data::{MemoryLayout, OwnedData, RawData};
pub use seeding::{Stream, derive_seed, rng_for};
