//! Tunable parameters for traversal, scoring and diagnostics

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hard ceiling on BFS depth; deeper searches over a personal network are noise
const MAX_SUPPORTED_DEPTH: usize = 12;

/// Coefficients of the proximity influence score
///
/// `raw = Σ (per_connection + per_weight·max(weight, 0) + per_strength·strength)`
/// over every touching edge, then `score = 100·(1 − e^(−raw / saturation))`.
/// Every coefficient is non-negative, so adding an edge never lowers the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluenceWeights {
    pub per_connection: f64,
    pub per_weight: f64,
    pub per_strength: f64,
    pub saturation: f64,
}

impl Default for InfluenceWeights {
    fn default() -> Self {
        Self {
            per_connection: 1.0,
            per_weight: 0.5,
            per_strength: 1.0,
            saturation: 20.0,
        }
    }
}

/// Point split of the 0-100 goal readiness score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessWeights {
    /// Points for supporter count (saturating at `target_supporters`)
    pub supporters: f64,
    /// Points for average relationship strength
    pub strength: f64,
    /// Points for the share of supporters contacted recently
    pub freshness: f64,
    /// Score at or above which readiness is High
    pub high_threshold: f64,
    /// Score at or above which readiness is Medium
    pub medium_threshold: f64,
}

impl Default for ReadinessWeights {
    fn default() -> Self {
        Self {
            supporters: 40.0,
            strength: 35.0,
            freshness: 25.0,
            high_threshold: 70.0,
            medium_threshold: 40.0,
        }
    }
}

/// Configuration for the graph engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphEngineConfig {
    /// BFS depth used when the caller does not ask for one
    pub default_max_depth: usize,

    /// Requested depths are clamped to `1..=max_depth_limit`
    pub max_depth_limit: usize,

    /// Days without interaction after which a relationship is stale
    pub stale_after_days: i64,

    /// Relationship strength below this is weak (0-5 scale)
    pub weak_strength_threshold: u8,

    /// Fewer supporters than this raises an under-supported alert
    pub min_supporters: usize,

    /// Supporter count that earns the full supporter share of readiness
    pub target_supporters: usize,

    /// Maximum number of sector highlight lines
    pub sector_highlight_limit: usize,

    /// A goal due within this many days and not High raises a due-soon alert
    pub due_soon_days: i64,

    /// Upper bound on one embedding request
    pub embedding_timeout_secs: u64,

    pub influence: InfluenceWeights,

    pub readiness: ReadinessWeights,
}

impl Default for GraphEngineConfig {
    fn default() -> Self {
        Self {
            default_max_depth: 3,
            max_depth_limit: 6,
            stale_after_days: 90,
            weak_strength_threshold: 3,
            min_supporters: 2,
            target_supporters: 5,
            sector_highlight_limit: 3,
            due_soon_days: 30,
            embedding_timeout_secs: 10,
            influence: InfluenceWeights::default(),
            readiness: ReadinessWeights::default(),
        }
    }
}

impl GraphEngineConfig {
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding_timeout_secs)
    }

    /// Clamp a requested BFS depth into the supported range
    pub fn clamp_depth(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_max_depth)
            .clamp(1, self.max_depth_limit.max(1))
    }

    /// Defaults overridden by `COMPASS_*` environment variables
    ///
    /// Recognised: `COMPASS_DEFAULT_MAX_DEPTH`, `COMPASS_MAX_DEPTH_LIMIT`,
    /// `COMPASS_STALE_AFTER_DAYS`, `COMPASS_WEAK_STRENGTH_THRESHOLD`,
    /// `COMPASS_MIN_SUPPORTERS`, `COMPASS_TARGET_SUPPORTERS`,
    /// `COMPASS_DUE_SOON_DAYS`, `COMPASS_EMBEDDING_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Result<Option<T>, String> {
            raw.map(|value| {
                value
                    .trim()
                    .parse::<T>()
                    .map_err(|_| format!("{} has an invalid value: '{}'", key, value))
            })
            .transpose()
        }

        let mut config = Self::default();

        macro_rules! override_from {
            ($key:literal, $field:ident) => {
                if let Some(value) = parse($key, lookup($key))? {
                    config.$field = value;
                }
            };
        }

        override_from!("COMPASS_DEFAULT_MAX_DEPTH", default_max_depth);
        override_from!("COMPASS_MAX_DEPTH_LIMIT", max_depth_limit);
        override_from!("COMPASS_STALE_AFTER_DAYS", stale_after_days);
        override_from!("COMPASS_WEAK_STRENGTH_THRESHOLD", weak_strength_threshold);
        override_from!("COMPASS_MIN_SUPPORTERS", min_supporters);
        override_from!("COMPASS_TARGET_SUPPORTERS", target_supporters);
        override_from!("COMPASS_DUE_SOON_DAYS", due_soon_days);
        override_from!("COMPASS_EMBEDDING_TIMEOUT_SECS", embedding_timeout_secs);

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_depth_limit == 0 {
            return Err("max_depth_limit must be greater than 0".to_string());
        }

        if self.max_depth_limit > MAX_SUPPORTED_DEPTH {
            return Err(format!(
                "max_depth_limit cannot exceed {}",
                MAX_SUPPORTED_DEPTH
            ));
        }

        if self.default_max_depth == 0 || self.default_max_depth > self.max_depth_limit {
            return Err(format!(
                "default_max_depth must be between 1 and max_depth_limit ({})",
                self.max_depth_limit
            ));
        }

        if self.stale_after_days <= 0 {
            return Err("stale_after_days must be greater than 0".to_string());
        }

        if self.weak_strength_threshold > crate::models::MAX_RELATIONSHIP_STRENGTH {
            return Err(format!(
                "weak_strength_threshold cannot exceed {}",
                crate::models::MAX_RELATIONSHIP_STRENGTH
            ));
        }

        if self.target_supporters == 0 {
            return Err("target_supporters must be greater than 0".to_string());
        }

        if self.due_soon_days < 0 {
            return Err("due_soon_days cannot be negative".to_string());
        }

        if self.embedding_timeout_secs == 0 {
            return Err("embedding_timeout_secs must be greater than 0".to_string());
        }

        let influence = &self.influence;
        if [
            influence.per_connection,
            influence.per_weight,
            influence.per_strength,
        ]
        .iter()
        .any(|c| !c.is_finite() || *c < 0.0)
        {
            return Err("influence coefficients must be finite and non-negative".to_string());
        }
        if !influence.saturation.is_finite() || influence.saturation <= 0.0 {
            return Err("influence saturation must be greater than 0".to_string());
        }

        let readiness = &self.readiness;
        let total = readiness.supporters + readiness.strength + readiness.freshness;
        if [readiness.supporters, readiness.strength, readiness.freshness]
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
            || total <= 0.0
        {
            return Err("readiness weights must be non-negative with a positive sum".to_string());
        }
        if readiness.medium_threshold > readiness.high_threshold {
            return Err("readiness medium_threshold cannot exceed high_threshold".to_string());
        }

        Ok(())
    }
}
