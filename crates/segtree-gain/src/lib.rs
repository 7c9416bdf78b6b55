// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Gain models scoring candidate splits of a node.

pub mod change_in_mean;
pub mod knn;
pub mod likelihood;
pub mod model;
pub mod random_forest;

pub use change_in_mean::ChangeInMean;
pub use knn::Knn;
pub use model::{GainCurve, GainModel, SearchStrategy};
pub use random_forest::RandomForestGain;

use segtree_core::{Control, SegError};
use std::fmt;
use std::str::FromStr;

/// Selector for the built-in gain models.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GainKind {
    ChangeInMean,
    Knn,
    RandomForest,
}

impl GainKind {
    pub const ALL: [Self; 3] = [Self::ChangeInMean, Self::Knn, Self::RandomForest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChangeInMean => "change_in_mean",
            Self::Knn => "knn",
            Self::RandomForest => "random_forest",
        }
    }

    /// Builds the model configured by `control`.
    pub fn build(&self, control: &Control) -> Result<Box<dyn GainModel>, SegError> {
        Ok(match self {
            Self::ChangeInMean => Box::new(ChangeInMean::new()),
            Self::Knn => Box::new(Knn::new()),
            Self::RandomForest => Box::new(RandomForestGain::new(
                control.random_forest.clone(),
                control.seed,
            )?),
        })
    }
}

impl fmt::Display for GainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GainKind {
    type Err = SegError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| {
                SegError::invalid_input(format!(
                    "unknown gain method {value:?}; expected one of change_in_mean, knn, random_forest"
                ))
            })
    }
}
