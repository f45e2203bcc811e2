//! Typed atom metadata and metric extractors
//!
//! Each atom type carries a loosely-typed JSON metadata blob. This module gives
//! every type an explicit struct with a fallible parse, and centralizes the
//! "missing key → default" policy in the extractors below. Extractors never
//! fail: malformed metadata is logged and the record contributes defaults.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::MetadataError;
use crate::types::{parse_timestamp, Atom, AtomType, MetricReading};

/// Typed metadata for one atom type
pub trait AtomMetadata: DeserializeOwned + Default {
    /// Atom type this metadata belongs to
    const ATOM_TYPE: AtomType;

    /// Parse metadata from an atom. Absent or null metadata yields the default.
    fn parse(atom: &Atom) -> Result<Self, MetadataError> {
        match &atom.metadata {
            None | Some(serde_json::Value::Null) => Ok(Self::default()),
            Some(value @ serde_json::Value::Object(_)) => serde_json::from_value(value.clone())
                .map_err(|source| MetadataError::Malformed {
                    atom_type: Self::ATOM_TYPE,
                    source,
                }),
            Some(_) => Err(MetadataError::NotAnObject {
                atom_type: Self::ATOM_TYPE,
            }),
        }
    }

    /// Parse metadata, falling back to defaults when it is malformed
    fn parse_or_default(atom: &Atom) -> Self {
        Self::parse(atom).unwrap_or_else(|err| {
            tracing::warn!(atom_id = %atom.id, error = %err, "malformed atom metadata, using defaults");
            Self::default()
        })
    }
}

/// Journal entry metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JournalMetadata {
    pub word_count: Option<u32>,
    pub valence: Option<f64>,
    pub energy: Option<f64>,
    pub is_grail: Option<bool>,
    pub linked_dimensions: Vec<String>,
}

impl AtomMetadata for JournalMetadata {
    const ATOM_TYPE: AtomType = AtomType::JournalEntry;
}

/// Mood check-in metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MoodMetadata {
    pub valence: Option<f64>,
    pub energy: Option<f64>,
}

impl AtomMetadata for MoodMetadata {
    const ATOM_TYPE: AtomType = AtomType::MoodCheckin;
}

/// Deep work session metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeepWorkMetadata {
    pub duration_minutes: Option<f64>,
    pub focus_score: Option<f64>,
}

impl AtomMetadata for DeepWorkMetadata {
    const ATOM_TYPE: AtomType = AtomType::DeepWorkSession;
}

/// Task metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskMetadata {
    pub is_completed: Option<bool>,
    /// ISO-8601 completion time
    pub completed_at: Option<String>,
}

impl AtomMetadata for TaskMetadata {
    const ATOM_TYPE: AtomType = AtomType::Task;
}

/// Workout metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkoutMetadata {
    pub duration_minutes: Option<f64>,
    pub workout_type: Option<String>,
}

impl AtomMetadata for WorkoutMetadata {
    const ATOM_TYPE: AtomType = AtomType::Workout;
}

/// Sleep record metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SleepMetadata {
    pub duration_hours: Option<f64>,
    pub duration_minutes: Option<f64>,
    /// 0-1, or a 0-100 percentage
    pub quality: Option<f64>,
}

impl AtomMetadata for SleepMetadata {
    const ATOM_TYPE: AtomType = AtomType::SleepRecord;
}

/// Meditation session metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeditationMetadata {
    pub duration_minutes: Option<f64>,
}

impl AtomMetadata for MeditationMetadata {
    const ATOM_TYPE: AtomType = AtomType::MeditationSession;
}

/// Which routine a completion belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoutineKind {
    #[default]
    Morning,
    Evening,
}

/// Routine completion metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoutineMetadata {
    pub kind: Option<RoutineKind>,
    pub completed_steps: Option<u32>,
    pub total_steps: Option<u32>,
}

impl AtomMetadata for RoutineMetadata {
    const ATOM_TYPE: AtomType = AtomType::RoutineCompletion;
}

/// Grail insight metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GrailMetadata {
    pub linked_dimensions: Vec<String>,
}

impl AtomMetadata for GrailMetadata {
    const ATOM_TYPE: AtomType = AtomType::GrailInsight;
}

/// Check that an atom's metadata parses as its type's struct.
///
/// Types without typed metadata only need an object (or nothing).
pub fn validate(atom: &Atom) -> Result<(), MetadataError> {
    match atom.atom_type {
        AtomType::JournalEntry => JournalMetadata::parse(atom).map(drop),
        AtomType::MoodCheckin => MoodMetadata::parse(atom).map(drop),
        AtomType::DeepWorkSession => DeepWorkMetadata::parse(atom).map(drop),
        AtomType::Task => TaskMetadata::parse(atom).map(drop),
        AtomType::Workout => WorkoutMetadata::parse(atom).map(drop),
        AtomType::SleepRecord => SleepMetadata::parse(atom).map(drop),
        AtomType::MeditationSession => MeditationMetadata::parse(atom).map(drop),
        AtomType::RoutineCompletion => RoutineMetadata::parse(atom).map(drop),
        AtomType::GrailInsight => GrailMetadata::parse(atom).map(drop),
        AtomType::ScreenTime | AtomType::Idea => match &atom.metadata {
            None | Some(serde_json::Value::Null) | Some(serde_json::Value::Object(_)) => Ok(()),
            Some(_) => Err(MetadataError::NotAnObject {
                atom_type: atom.atom_type,
            }),
        },
    }
}

// ============================================================================
// Extractors
// ============================================================================

/// Word count of a journal entry.
///
/// Uses the stored `wordCount` when present, otherwise splits the body on
/// whitespace.
pub fn word_count(atom: &Atom) -> u32 {
    JournalMetadata::parse_or_default(atom)
        .word_count
        .unwrap_or_else(|| {
            atom.body
                .as_deref()
                .map(|body| body.split_whitespace().count() as u32)
                .unwrap_or(0)
        })
}

/// Duration in minutes for timed atoms (deep work, workout, meditation)
pub fn duration_minutes(atom: &Atom) -> Option<f64> {
    let minutes = match atom.atom_type {
        AtomType::DeepWorkSession => DeepWorkMetadata::parse_or_default(atom).duration_minutes,
        AtomType::Workout => WorkoutMetadata::parse_or_default(atom).duration_minutes,
        AtomType::MeditationSession => {
            MeditationMetadata::parse_or_default(atom).duration_minutes
        }
        _ => None,
    };
    minutes.filter(|m| m.is_finite() && *m >= 0.0)
}

/// Valence and energy of a mood-bearing atom, clamped to [-1, 1].
///
/// Mood check-ins always yield a point (missing keys default to 0.0). Journal
/// entries yield a point only when they carry at least one of the two keys.
pub fn mood(atom: &Atom) -> Option<(f64, f64)> {
    let (valence, energy) = match atom.atom_type {
        AtomType::MoodCheckin => {
            let meta = MoodMetadata::parse_or_default(atom);
            (Some(meta.valence.unwrap_or(0.0)), meta.energy)
        }
        AtomType::JournalEntry => {
            let meta = JournalMetadata::parse_or_default(atom);
            if meta.valence.is_none() && meta.energy.is_none() {
                return None;
            }
            (meta.valence, meta.energy)
        }
        _ => return None,
    };
    Some((
        clamp_unit(valence.unwrap_or(0.0)),
        clamp_unit(energy.unwrap_or(0.0)),
    ))
}

/// Whether a task is completed (missing key → false)
pub fn is_completed(atom: &Atom) -> bool {
    atom.atom_type == AtomType::Task
        && TaskMetadata::parse_or_default(atom)
            .is_completed
            .unwrap_or(false)
}

/// When a completed task was completed.
///
/// Uses `completedAt` when it parses, otherwise the creation time. Open tasks
/// yield `None`.
pub fn completion_time(atom: &Atom) -> Option<DateTime<Utc>> {
    if atom.atom_type != AtomType::Task {
        return None;
    }
    let meta = TaskMetadata::parse_or_default(atom);
    if !meta.is_completed.unwrap_or(false) {
        return None;
    }
    meta.completed_at
        .as_deref()
        .and_then(|raw| parse_timestamp(raw).ok())
        .or_else(|| atom.created_at_utc())
}

/// Hours slept, from `durationHours` or `durationMinutes`
pub fn sleep_hours(atom: &Atom) -> Option<f64> {
    if atom.atom_type != AtomType::SleepRecord {
        return None;
    }
    let meta = SleepMetadata::parse_or_default(atom);
    meta.duration_hours
        .or_else(|| meta.duration_minutes.map(|m| m / 60.0))
        .filter(|h| h.is_finite() && *h >= 0.0)
}

/// Stated sleep quality normalized to 0-1
pub fn sleep_quality(atom: &Atom) -> Option<f64> {
    if atom.atom_type != AtomType::SleepRecord {
        return None;
    }
    SleepMetadata::parse_or_default(atom)
        .quality
        .filter(|q| q.is_finite() && *q >= 0.0)
        .map(|q| if q > 1.0 { q / 100.0 } else { q })
        .map(|q| q.clamp(0.0, 1.0))
}

/// Routine kind of a routine completion (missing key → morning)
pub fn routine_kind(atom: &Atom) -> RoutineKind {
    RoutineMetadata::parse_or_default(atom)
        .kind
        .unwrap_or_default()
}

/// Fraction of routine steps completed (no step counts → fully completed)
pub fn routine_completion(atom: &Atom) -> f64 {
    let meta = RoutineMetadata::parse_or_default(atom);
    match (meta.completed_steps, meta.total_steps) {
        (Some(done), Some(total)) if total > 0 => (done as f64 / total as f64).clamp(0.0, 1.0),
        _ => 1.0,
    }
}

/// Whether an atom is a flagged breakthrough insight
pub fn is_grail(atom: &Atom) -> bool {
    match atom.atom_type {
        AtomType::GrailInsight => true,
        AtomType::JournalEntry => JournalMetadata::parse_or_default(atom)
            .is_grail
            .unwrap_or(false),
        _ => false,
    }
}

/// Dimensions a grail insight links to
pub fn linked_dimensions(atom: &Atom) -> Vec<String> {
    match atom.atom_type {
        AtomType::GrailInsight => GrailMetadata::parse_or_default(atom).linked_dimensions,
        AtomType::JournalEntry => JournalMetadata::parse_or_default(atom).linked_dimensions,
        _ => Vec::new(),
    }
}

/// Screen time after 10pm. There is no data hook for this metric yet.
pub fn late_screen_time(_atoms: &[Atom]) -> MetricReading {
    MetricReading::Unimplemented
}

/// Dopamine delay (time before first reactive app use). There is no data hook
/// for this metric yet.
pub fn dopamine_delay(_atoms: &[Atom]) -> MetricReading {
    MetricReading::Unimplemented
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}
