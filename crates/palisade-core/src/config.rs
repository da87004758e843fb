//! Guard configuration: thresholds, feature flags, and partial updates.
//!
//! A [`GuardConfig`] is a plain value; the engine keeps one behind a lock
//! and hands out snapshots. Updates go through [`GuardConfigPatch`] so a
//! caller can change a subset of fields, and validation runs on the merged
//! result before anything is replaced.

use serde::{Deserialize, Serialize};

use crate::error::{GuardError, Result};

/// Thresholds and feature flags for the guard pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Score at or above which content is blocked.
    pub context_score_threshold: i32,
    /// Distinct lexicon entries co-occurring within the cluster window
    /// that count as a cluster.
    pub cluster_match_threshold: usize,
    /// Width of the clustering window, in tokens.
    pub cluster_window_tokens: usize,
    /// Maximum Hamming distance for fuzzy equality on equal-length tokens.
    pub hamming_distance_threshold: usize,
    /// Minimum token and term length before phonetic matching is attempted.
    pub soundex_min_length: usize,
    /// Minimum character-2-gram Jaccard similarity to count as a match.
    pub jaccard_threshold: f64,
    /// Requests allowed per caller within one rate window.
    pub rate_limit_max_requests: u32,
    /// Rate window length in seconds.
    pub rate_limit_window_seconds: u64,
    /// Enables Hamming/Jaccard/phonetic matching; exact matching always runs.
    pub enable_fuzzy_matching: bool,
    /// Enables the windowed cluster bonus.
    pub enable_clustering: bool,
    /// Enables the cross-sentence co-occurrence surcharge.
    pub enable_cross_sentence: bool,
    /// Enables the prompt-injection detector.
    pub enable_injection_detection: bool,
}

impl Default for GuardConfig {
    /// Shipped defaults. Tuned so that clustered school/youth phrasing
    /// ("high school girl", "teen romance") lands at or above the block
    /// threshold while a single ambiguous term only softens.
    fn default() -> Self {
        Self {
            context_score_threshold: 10,
            cluster_match_threshold: 2,
            cluster_window_tokens: 6,
            hamming_distance_threshold: 1,
            soundex_min_length: 5,
            jaccard_threshold: 0.7,
            rate_limit_max_requests: 100,
            rate_limit_window_seconds: 60,
            enable_fuzzy_matching: true,
            enable_clustering: true,
            enable_cross_sentence: true,
            enable_injection_detection: true,
        }
    }
}

impl GuardConfig {
    /// Checks every field; returns the first violation found.
    pub fn validate(&self) -> Result<()> {
        if self.context_score_threshold < 0 {
            return Err(GuardError::InvalidConfig(
                "context_score_threshold must be >= 0".to_string(),
            ));
        }
        if self.cluster_match_threshold < 1 {
            return Err(GuardError::InvalidConfig(
                "cluster_match_threshold must be >= 1".to_string(),
            ));
        }
        if self.cluster_window_tokens < 1 {
            return Err(GuardError::InvalidConfig(
                "cluster_window_tokens must be >= 1".to_string(),
            ));
        }
        if !self.jaccard_threshold.is_finite() {
            return Err(GuardError::InvalidConfig(
                "jaccard_threshold must be finite".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.jaccard_threshold) {
            return Err(GuardError::InvalidConfig(
                "jaccard_threshold must be within [0, 1]".to_string(),
            ));
        }
        if self.rate_limit_max_requests < 1 {
            return Err(GuardError::InvalidConfig(
                "rate_limit_max_requests must be >= 1".to_string(),
            ));
        }
        if self.rate_limit_window_seconds < 1 {
            return Err(GuardError::InvalidConfig(
                "rate_limit_window_seconds must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Weight credited for a stated adult age, counteracting ambiguous
    /// youth terms without ever going positive.
    pub fn adult_marker_weight(&self) -> i32 {
        -(self.context_score_threshold / 2)
    }

    /// Returns a copy with the patch's set fields applied.
    pub fn merged(&self, patch: &GuardConfigPatch) -> GuardConfig {
        let mut merged = self.clone();
        if let Some(v) = patch.context_score_threshold {
            merged.context_score_threshold = v;
        }
        if let Some(v) = patch.cluster_match_threshold {
            merged.cluster_match_threshold = v;
        }
        if let Some(v) = patch.cluster_window_tokens {
            merged.cluster_window_tokens = v;
        }
        if let Some(v) = patch.hamming_distance_threshold {
            merged.hamming_distance_threshold = v;
        }
        if let Some(v) = patch.soundex_min_length {
            merged.soundex_min_length = v;
        }
        if let Some(v) = patch.jaccard_threshold {
            merged.jaccard_threshold = v;
        }
        if let Some(v) = patch.rate_limit_max_requests {
            merged.rate_limit_max_requests = v;
        }
        if let Some(v) = patch.rate_limit_window_seconds {
            merged.rate_limit_window_seconds = v;
        }
        if let Some(v) = patch.enable_fuzzy_matching {
            merged.enable_fuzzy_matching = v;
        }
        if let Some(v) = patch.enable_clustering {
            merged.enable_clustering = v;
        }
        if let Some(v) = patch.enable_cross_sentence {
            merged.enable_cross_sentence = v;
        }
        if let Some(v) = patch.enable_injection_detection {
            merged.enable_injection_detection = v;
        }
        merged
    }
}

/// Partial configuration update. Unset fields keep their current value;
/// unknown JSON keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuardConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_score_threshold: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_match_threshold: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_window_tokens: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hamming_distance_threshold: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soundex_min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jaccard_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit_max_requests: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit_window_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_fuzzy_matching: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_clustering: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_cross_sentence: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_injection_detection: Option<bool>,
}

impl GuardConfigPatch {
    /// Parses a patch from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| GuardError::InvalidInput(e.to_string()))
    }
}
