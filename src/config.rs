//! Scoring configuration
//!
//! All tunables for the scoring pipeline live here. Defaults reproduce the
//! fixed weights and thresholds of the dashboards; a JSON file can override
//! any subset of them.

use std::path::Path;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::DimensionError;

/// Default half-life for confidence decay in hours
pub const DEFAULT_FRESHNESS_HALF_LIFE_HOURS: f64 = 72.0;

/// Default trend threshold on a normalized 0-1 scale
pub const DEFAULT_TREND_THRESHOLD: f64 = 0.15;

/// Longest trailing window, in days, any window setting may span
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// Weights of the Behavioral (discipline) index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehavioralWeights {
    pub morning_routine: f64,
    pub deep_work: f64,
    pub sleep: f64,
    pub tasks: f64,
    pub screen: f64,
    pub movement: f64,
}

impl Default for BehavioralWeights {
    fn default() -> Self {
        Self {
            morning_routine: 0.15,
            deep_work: 0.25,
            sleep: 0.15,
            tasks: 0.20,
            screen: 0.10,
            movement: 0.15,
        }
    }
}

impl BehavioralWeights {
    fn all(&self) -> [(&'static str, f64); 6] {
        [
            ("morning_routine", self.morning_routine),
            ("deep_work", self.deep_work),
            ("sleep", self.sleep),
            ("tasks", self.tasks),
            ("screen", self.screen),
            ("movement", self.movement),
        ]
    }
}

/// Weights of the Reflection index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflectionWeights {
    pub journaling: f64,
    pub depth: f64,
    pub emotional_awareness: f64,
    pub meditation: f64,
    pub insight: f64,
}

impl Default for ReflectionWeights {
    fn default() -> Self {
        Self {
            journaling: 0.30,
            depth: 0.25,
            emotional_awareness: 0.20,
            meditation: 0.15,
            insight: 0.10,
        }
    }
}

impl ReflectionWeights {
    fn all(&self) -> [(&'static str, f64); 5] {
        [
            ("journaling", self.journaling),
            ("depth", self.depth),
            ("emotional_awareness", self.emotional_awareness),
            ("meditation", self.meditation),
            ("insight", self.insight),
        ]
    }
}

/// Theme extraction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    /// Tokens must be strictly longer than this
    pub min_token_len: usize,
    /// Lemmas need at least this many occurrences
    pub min_mentions: u32,
    /// Maximum number of themes returned
    pub max_themes: usize,
    /// Trailing window for `weekly_change`
    pub weekly_window_days: u32,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            min_token_len: 3,
            min_mentions: 3,
            max_themes: 10,
            weekly_window_days: 7,
        }
    }
}

/// Top-level configuration shared by every dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionConfig {
    /// Local timezone as an offset from UTC in minutes
    pub utc_offset_minutes: i32,
    /// Minimum mean difference for an improving/declining trend
    pub trend_threshold: f64,
    /// Trailing window for consistency percentages
    pub consistency_window_days: u32,
    /// Half-life of index confidence as data ages
    pub freshness_half_life_hours: f64,
    /// Trailing window for mood buckets
    pub mood_window_days: u32,
    pub behavioral: BehavioralWeights,
    pub reflection: ReflectionWeights,
    pub themes: ThemeConfig,
}

impl Default for DimensionConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            trend_threshold: DEFAULT_TREND_THRESHOLD,
            consistency_window_days: 7,
            freshness_half_life_hours: DEFAULT_FRESHNESS_HALF_LIFE_HOURS,
            mood_window_days: 14,
            behavioral: BehavioralWeights::default(),
            reflection: ReflectionWeights::default(),
            themes: ThemeConfig::default(),
        }
    }
}

impl DimensionConfig {
    /// Parse and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, DimensionError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, DimensionError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize the configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, DimensionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Local timezone offset
    pub fn offset(&self) -> Result<FixedOffset, DimensionError> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .ok_or(DimensionError::InvalidTimezone(self.utc_offset_minutes))
    }

    /// Check ranges of every tunable
    pub fn validate(&self) -> Result<(), DimensionError> {
        self.offset()?;

        if !(0.0..=1.0).contains(&self.trend_threshold) {
            return Err(DimensionError::InvalidConfig(format!(
                "trend_threshold must be within [0, 1], got {}",
                self.trend_threshold
            )));
        }
        let windows = [
            ("consistency_window_days", self.consistency_window_days),
            ("mood_window_days", self.mood_window_days),
            ("themes.weekly_window_days", self.themes.weekly_window_days),
        ];
        for (name, days) in windows {
            if !(1..=MAX_WINDOW_DAYS).contains(&days) {
                return Err(DimensionError::InvalidConfig(format!(
                    "{name} must be within [1, {MAX_WINDOW_DAYS}], got {days}"
                )));
            }
        }
        if self.freshness_half_life_hours.is_nan() || self.freshness_half_life_hours <= 0.0 {
            return Err(DimensionError::InvalidConfig(
                "freshness_half_life_hours must be positive".to_string(),
            ));
        }
        if self.themes.max_themes == 0 {
            return Err(DimensionError::InvalidConfig(
                "themes.max_themes must be positive".to_string(),
            ));
        }

        let weights = self
            .behavioral
            .all()
            .into_iter()
            .map(|(name, w)| (format!("behavioral.{name}"), w))
            .chain(
                self.reflection
                    .all()
                    .into_iter()
                    .map(|(name, w)| (format!("reflection.{name}"), w)),
            );
        for (name, weight) in weights {
            if !(0.0..=1.0).contains(&weight) {
                return Err(DimensionError::InvalidConfig(format!(
                    "weight {name} must be within [0, 1], got {weight}"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_weights() {
        let config = DimensionConfig::default();
        let behavioral: f64 = config.behavioral.all().iter().map(|(_, w)| w).sum();
        let reflection: f64 = config.reflection.all().iter().map(|(_, w)| w).sum();

        assert!((behavioral - 1.0).abs() < 1e-9);
        assert!((reflection - 1.0).abs() < 1e-9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_override() {
        let config = DimensionConfig::from_json(
            r#"{ "utc_offset_minutes": -300, "behavioral": { "deep_work": 0.4 } }"#,
        )
        .unwrap();

        assert_eq!(config.utc_offset_minutes, -300);
        assert_eq!(config.behavioral.deep_work, 0.4);
        assert_eq!(config.behavioral.sleep, 0.15);
        assert_eq!(config.themes.min_mentions, 3);
        assert_eq!(config.offset().unwrap().local_minus_utc(), -300 * 60);
    }

    #[test]
    fn test_invalid_offset_rejected() {
        let result = DimensionConfig::from_json(r#"{ "utc_offset_minutes": 2000 }"#);
        assert!(matches!(result, Err(DimensionError::InvalidTimezone(2000))));
    }

    #[test]
    fn test_invalid_weight_rejected() {
        let result = DimensionConfig::from_json(r#"{ "reflection": { "depth": 1.5 } }"#);
        assert!(matches!(result, Err(DimensionError::InvalidConfig(_))));
    }

    #[test]
    fn test_window_bounds_rejected() {
        let oversized = DimensionConfig {
            consistency_window_days: 200_000_000,
            ..DimensionConfig::default()
        };
        assert!(matches!(oversized.validate(), Err(DimensionError::InvalidConfig(_))));

        let mood = DimensionConfig {
            mood_window_days: MAX_WINDOW_DAYS + 1,
            ..DimensionConfig::default()
        };
        assert!(matches!(mood.validate(), Err(DimensionError::InvalidConfig(_))));

        let mut themes = DimensionConfig::default();
        themes.themes.weekly_window_days = 0;
        assert!(matches!(themes.validate(), Err(DimensionError::InvalidConfig(_))));

        let at_limit = DimensionConfig {
            consistency_window_days: MAX_WINDOW_DAYS,
            mood_window_days: MAX_WINDOW_DAYS,
            ..DimensionConfig::default()
        };
        assert!(at_limit.validate().is_ok());

        // Out of u32 range: rejected at parse time instead of truncating
        let result =
            DimensionConfig::from_json(r#"{ "themes": { "weekly_window_days": 4294967296 } }"#);
        assert!(matches!(result, Err(DimensionError::JsonError(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "trend_threshold": 0.2 }}"#).unwrap();

        let config = DimensionConfig::load(file.path()).unwrap();
        assert_eq!(config.trend_threshold, 0.2);
    }

    #[test]
    fn test_round_trip_preserves_defaults() {
        let config = DimensionConfig::default();
        let loaded = DimensionConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(config, loaded);
    }
}
