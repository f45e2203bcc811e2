//! Behavioral dimension provider

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::behavior::metrics;
use crate::composite::{assemble_index, IndexParams};
use crate::config::{BehavioralWeights, DimensionConfig};
use crate::error::DimensionError;
use crate::metadata;
use crate::narrative::predictions;
use crate::pipeline::DimensionProvider;
use crate::store::AtomSnapshot;
use crate::streak::build_streak;
use crate::temporal::{active_days, DayWindow};
use crate::types::{
    AtomType, ComponentScore, DimensionIndex, MetricReading, Prediction, Streak, StreakCategory,
};

/// Atom types the Behavioral dimension reads
pub const BEHAVIORAL_TYPES: &[AtomType] = &[
    AtomType::DeepWorkSession,
    AtomType::Workout,
    AtomType::SleepRecord,
    AtomType::Task,
    AtomType::RoutineCompletion,
    AtomType::ScreenTime,
];

/// Display snapshot of the Behavioral dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehavioralSnapshot {
    /// Anchor the snapshot was derived for
    pub computed_at: DateTime<Utc>,
    /// Local calendar day of `computed_at`
    pub local_date: NaiveDate,
    /// Discipline index
    pub index: DimensionIndex,
    pub components: Vec<ComponentScore>,
    pub streaks: Vec<Streak>,
    pub predictions: Vec<Prediction>,
    /// Metrics reported but not yet backed by data
    pub unimplemented_metrics: Vec<String>,
}

/// Derives [`BehavioralSnapshot`]s from deep work, movement, sleep, tasks and
/// routines
#[derive(Debug, Clone)]
pub struct BehavioralProvider {
    offset: FixedOffset,
    weights: BehavioralWeights,
    window_days: u32,
    trend_threshold: f64,
    half_life_hours: f64,
}

impl BehavioralProvider {
    /// Create a provider from a validated configuration
    pub fn new(config: &DimensionConfig) -> Result<Self, DimensionError> {
        config.validate()?;
        Ok(Self {
            offset: config.offset()?,
            weights: config.behavioral.clone(),
            window_days: config.consistency_window_days,
            trend_threshold: config.trend_threshold,
            half_life_hours: config.freshness_half_life_hours,
        })
    }
}

impl DimensionProvider for BehavioralProvider {
    type Snapshot = BehavioralSnapshot;

    fn name(&self) -> &'static str {
        "behavioral"
    }

    fn required_types(&self) -> &'static [AtomType] {
        BEHAVIORAL_TYPES
    }

    fn derive(&self, atoms: &AtomSnapshot, now: DateTime<Utc>) -> BehavioralSnapshot {
        let window = DayWindow::new(now, self.offset, self.window_days);
        let today = window.today;
        let w = &self.weights;

        let inputs = vec![
            metrics::morning_routine(atoms, &window, w.morning_routine),
            metrics::deep_work(atoms, &window, w.deep_work),
            metrics::sleep(atoms, &window, w.sleep),
            metrics::tasks(atoms, &window, w.tasks),
            metrics::screen(atoms, w.screen),
            metrics::movement(atoms, &window, w.movement),
        ];

        let params = IndexParams {
            now,
            today,
            trend_threshold: self.trend_threshold,
            half_life_hours: self.half_life_hours,
        };
        let (index, components) = assemble_index(&inputs, atoms.newest(BEHAVIORAL_TYPES), params);

        let streaks = vec![
            build_streak(
                StreakCategory::DeepWork,
                &active_days(atoms.of(AtomType::DeepWorkSession), &self.offset, |_| true),
                today,
            ),
            build_streak(
                StreakCategory::Movement,
                &active_days(atoms.of(AtomType::Workout), &self.offset, |_| true),
                today,
            ),
            build_streak(
                StreakCategory::MorningRoutine,
                &active_days(
                    atoms.of(AtomType::RoutineCompletion),
                    &self.offset,
                    metrics::is_morning_routine,
                ),
                today,
            ),
            build_streak(
                StreakCategory::TaskCompletion,
                &metrics::task_completion_days(atoms.of(AtomType::Task), &self.offset),
                today,
            ),
        ];

        let mut unimplemented_metrics: Vec<String> = components
            .iter()
            .filter(|c| c.reading == MetricReading::Unimplemented)
            .map(|c| c.name.clone())
            .collect();
        if metadata::dopamine_delay(atoms.of(AtomType::ScreenTime)) == MetricReading::Unimplemented {
            unimplemented_metrics.push("dopamine_delay".to_string());
        }

        BehavioralSnapshot {
            computed_at: now,
            local_date: today,
            predictions: predictions(&streaks, &components, today),
            index,
            components,
            streaks,
            unimplemented_metrics,
        }
    }
}
