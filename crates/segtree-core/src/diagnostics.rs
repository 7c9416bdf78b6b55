// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::borrow::Cow;

/// Diagnostics schema version for segmentation run metadata.
pub const DIAGNOSTICS_SCHEMA_VERSION: u32 = 1;

/// Structured diagnostics captured from a segmentation run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostics {
    pub n: usize,
    pub d: usize,
    pub schema_version: u32,
    pub engine_version: Option<String>,
    pub runtime_ms: Option<u64>,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
    /// Candidate strategy: `bs`, `sbs` or `wbs`.
    pub algorithm: Cow<'static, str>,
    pub gain_model: Cow<'static, str>,
    pub seed: Option<u64>,
    pub thread_count: Option<usize>,
    #[cfg(feature = "serde")]
    pub params_json: Option<serde_json::Value>,
    pub pool_size: usize,
    pub nodes_evaluated: usize,
    pub permutations_run: usize,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            n: 0,
            d: 0,
            schema_version: DIAGNOSTICS_SCHEMA_VERSION,
            engine_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            runtime_ms: None,
            notes: vec![],
            warnings: vec![],
            algorithm: Cow::Borrowed(""),
            gain_model: Cow::Borrowed(""),
            seed: None,
            thread_count: None,
            #[cfg(feature = "serde")]
            params_json: None,
            pool_size: 0,
            nodes_evaluated: 0,
            permutations_run: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DIAGNOSTICS_SCHEMA_VERSION, Diagnostics};
    use std::borrow::Cow;

    #[test]
    fn default_records_schema_and_crate_version() {
        let diagnostics = Diagnostics::default();
        assert_eq!(diagnostics.schema_version, DIAGNOSTICS_SCHEMA_VERSION);
        assert_eq!(
            diagnostics.engine_version,
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
        assert_eq!(diagnostics.algorithm, Cow::Borrowed(""));
        assert_eq!(diagnostics.pool_size, 0);
        assert!(diagnostics.runtime_ms.is_none());
        assert!(diagnostics.notes.is_empty());
        assert!(diagnostics.warnings.is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip_keeps_run_counters() {
        let diagnostics = Diagnostics {
            n: 150,
            d: 4,
            schema_version: DIAGNOSTICS_SCHEMA_VERSION,
            engine_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            runtime_ms: Some(12),
            notes: vec!["pool_size=19".to_string()],
            warnings: vec!["wild interval pool exhausted".to_string()],
            algorithm: Cow::Owned("sbs".to_string()),
            gain_model: Cow::Owned("knn".to_string()),
            seed: Some(42),
            thread_count: Some(8),
            params_json: Some(serde_json::json!({ "model_selection_alpha": 0.05 })),
            pool_size: 19,
            nodes_evaluated: 5,
            permutations_run: 597,
        };

        let encoded = serde_json::to_string(&diagnostics).expect("serialize");
        let decoded: Diagnostics = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(decoded, diagnostics);
    }
}
