// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Errors produced while validating input or fitting a segmentation.
///
/// Only `InvalidInput` and `ResourceLimit` ever abort a run. `Unfittable` and
/// `NumericDegenerate` describe per-candidate degeneracies that gain models
/// report internally and absorb as a zero gain.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SegError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("classifier cannot be fit: {0}")]
    Unfittable(String),
    #[error("numerically degenerate: {0}")]
    NumericDegenerate(String),
    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),
}

impl SegError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn unfittable(message: impl Into<String>) -> Self {
        Self::Unfittable(message.into())
    }

    pub fn numeric_degenerate(message: impl Into<String>) -> Self {
        Self::NumericDegenerate(message.into())
    }

    pub fn resource_limit(message: impl Into<String>) -> Self {
        Self::ResourceLimit(message.into())
    }

    /// True for errors a gain model may swallow and report as zero gain.
    pub fn is_absorbable(&self) -> bool {
        matches!(self, Self::Unfittable(_) | Self::NumericDegenerate(_))
    }
}
