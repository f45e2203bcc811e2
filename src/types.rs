//! Core data types for dimension scoring
//!
//! This module defines the atom record read from the store and the derived,
//! display-ready entities every dimension produces from it.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DimensionError;

/// Record type tag of an atom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AtomType {
    Task,
    JournalEntry,
    MoodCheckin,
    DeepWorkSession,
    Workout,
    SleepRecord,
    MeditationSession,
    RoutineCompletion,
    ScreenTime,
    GrailInsight,
    Idea,
}

impl AtomType {
    /// Every atom type, in declaration order
    pub const ALL: [AtomType; 11] = [
        AtomType::Task,
        AtomType::JournalEntry,
        AtomType::MoodCheckin,
        AtomType::DeepWorkSession,
        AtomType::Workout,
        AtomType::SleepRecord,
        AtomType::MeditationSession,
        AtomType::RoutineCompletion,
        AtomType::ScreenTime,
        AtomType::GrailInsight,
        AtomType::Idea,
    ];
}

/// A generic timestamped record owned by the external store.
///
/// Atoms are immutable once fetched; the store creates new rows for updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Atom {
    /// Store-assigned identifier
    pub id: String,
    /// Record type tag
    #[serde(rename = "type")]
    pub atom_type: AtomType,
    /// Short title
    #[serde(default)]
    pub title: String,
    /// Optional free-form text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Loosely-typed metadata blob with well-known keys per atom type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// ISO-8601 creation timestamp as stored
    pub created_at: String,
    /// Soft-delete flag
    #[serde(default)]
    pub is_deleted: bool,
}

impl Atom {
    /// Parse `created_at`, returning `None` when the stored string is not a
    /// recognizable timestamp. Such atoms are excluded from temporal bucketing.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at).ok()
    }
}

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 and naive `YYYY-MM-DDTHH:MM:SS[.fff]` (interpreted as UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DimensionError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| DimensionError::DateParseError(raw.to_string()))
}

/// Direction of a metric over the recent window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
}

/// Direction of a dimension index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexTrend {
    Rising,
    Stable,
    Falling,
}

impl From<TrendDirection> for IndexTrend {
    fn from(direction: TrendDirection) -> Self {
        match direction {
            TrendDirection::Improving => IndexTrend::Rising,
            TrendDirection::Stable => IndexTrend::Stable,
            TrendDirection::Declining => IndexTrend::Falling,
        }
    }
}

/// Composite 0-100 index for one dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionIndex {
    /// Weighted composite score (0-100)
    pub score: f64,
    /// Confidence in the score (0-1)
    pub confidence: f64,
    /// Direction of the index over the recent window
    pub trend: IndexTrend,
    /// Available sub-scores keyed by component name (0-100)
    pub sub_scores: BTreeMap<String, f64>,
    /// Age in seconds of the newest contributing atom, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_age_seconds: Option<i64>,
}

/// Outcome of extracting one component metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum MetricReading {
    /// Normalized value (0-1)
    Available(f64),
    /// No qualifying records in the window
    NoData,
    /// Metric has no data source yet
    Unimplemented,
}

impl MetricReading {
    /// The normalized value, if available
    pub fn value(&self) -> Option<f64> {
        match self {
            MetricReading::Available(v) => Some(*v),
            MetricReading::NoData | MetricReading::Unimplemented => None,
        }
    }

    /// Build a reading from an optional value, clamping to 0-1
    pub fn from_option(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => MetricReading::Available(v.clamp(0.0, 1.0)),
            _ => MetricReading::NoData,
        }
    }
}

/// Display status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentStatus {
    Excellent,
    Good,
    NeedsWork,
    AtRisk,
}

/// Score of one component of a dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentScore {
    /// Component name (lower_snake_case)
    pub name: String,
    /// Current score (0-100); neutral 50 when the reading is unavailable
    pub current_score: f64,
    /// Recent trend of the component's daily series
    pub trend: TrendDirection,
    /// Status bucket derived from the score
    pub status: ComponentStatus,
    /// Underlying reading
    pub reading: MetricReading,
}

/// Streak categories tracked across dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StreakCategory {
    DeepWork,
    Movement,
    MorningRoutine,
    TaskCompletion,
    Journaling,
    Meditation,
    MoodCheckin,
}

/// Consecutive-day streak for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
    pub name: String,
    pub category: StreakCategory,
    pub current_days: u32,
    pub personal_best: u32,
    pub days_to_next_milestone: u32,
    /// True when the streak is alive but today has no activity yet
    pub is_endangered: bool,
    pub xp_per_day: u32,
    #[serde(rename = "milestoneXP")]
    pub milestone_xp: u32,
}

/// Origin of an emotional data point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MoodSource {
    Manual,
    Journal,
    Inferred,
}

/// One point on the mood timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionalDataPoint {
    pub timestamp: DateTime<Utc>,
    /// Valence in [-1, 1]
    pub valence: f64,
    /// Energy in [-1, 1]
    pub energy: f64,
    pub source: MoodSource,
}

/// Per-day mean of the mood timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodBucket {
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    pub samples: u32,
}

/// Recurring theme extracted from journal text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionTheme {
    /// Lemma
    pub name: String,
    /// Total occurrences across all journal entries
    pub mention_count: u32,
    /// Occurrences within the trailing week
    pub weekly_change: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_mentioned: Option<DateTime<Utc>>,
}

/// Flagged breakthrough insight with cross-dimension links
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrailInsight {
    pub atom_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub linked_dimensions: Vec<String>,
}

/// Kind of narrative prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PredictionKind {
    StreakAtRisk,
    MilestoneAhead,
    ComponentDeclining,
    ComponentImproving,
}

/// Narrative prediction shown alongside a dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub kind: PredictionKind,
    /// Streak or component the prediction is about
    pub subject: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_date: Option<NaiveDate>,
}
