//! Reflection dimension provider

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::composite::{assemble_index, IndexParams};
use crate::config::{DimensionConfig, ReflectionWeights, ThemeConfig};
use crate::error::DimensionError;
use crate::narrative::predictions;
use crate::pipeline::DimensionProvider;
use crate::reflection::metrics;
use crate::reflection::mood::{mood_buckets, mood_timeline};
use crate::reflection::themes::ThemeCache;
use crate::store::AtomSnapshot;
use crate::streak::build_streak;
use crate::temporal::{active_days, DayWindow};
use crate::types::{
    AtomType, ComponentScore, DimensionIndex, EmotionalDataPoint, GrailInsight, MoodBucket,
    Prediction, ReflectionTheme, Streak, StreakCategory,
};

/// Atom types the Reflection dimension reads
pub const REFLECTION_TYPES: &[AtomType] = &[
    AtomType::JournalEntry,
    AtomType::MoodCheckin,
    AtomType::MeditationSession,
    AtomType::GrailInsight,
];

/// Display snapshot of the Reflection dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionSnapshot {
    pub computed_at: DateTime<Utc>,
    pub local_date: NaiveDate,
    /// Reflection index
    pub index: DimensionIndex,
    pub components: Vec<ComponentScore>,
    pub streaks: Vec<Streak>,
    pub themes: Vec<ReflectionTheme>,
    pub mood_timeline: Vec<EmotionalDataPoint>,
    pub mood_buckets: Vec<MoodBucket>,
    pub grail_insights: Vec<GrailInsight>,
    pub predictions: Vec<Prediction>,
}

/// Derives [`ReflectionSnapshot`]s from journals, mood check-ins, meditation
/// and grail insights
#[derive(Debug)]
pub struct ReflectionProvider {
    offset: FixedOffset,
    weights: ReflectionWeights,
    themes: ThemeConfig,
    window_days: u32,
    mood_window_days: u32,
    trend_threshold: f64,
    half_life_hours: f64,
    theme_cache: ThemeCache,
}

impl ReflectionProvider {
    /// Create a provider from a validated configuration
    pub fn new(config: &DimensionConfig) -> Result<Self, DimensionError> {
        config.validate()?;
        Ok(Self {
            offset: config.offset()?,
            weights: config.reflection.clone(),
            themes: config.themes.clone(),
            window_days: config.consistency_window_days,
            mood_window_days: config.mood_window_days,
            trend_threshold: config.trend_threshold,
            half_life_hours: config.freshness_half_life_hours,
            theme_cache: ThemeCache::new(),
        })
    }
}

impl DimensionProvider for ReflectionProvider {
    type Snapshot = ReflectionSnapshot;

    fn name(&self) -> &'static str {
        "reflection"
    }

    fn required_types(&self) -> &'static [AtomType] {
        REFLECTION_TYPES
    }

    fn derive(&self, atoms: &AtomSnapshot, now: DateTime<Utc>) -> ReflectionSnapshot {
        let window = DayWindow::new(now, self.offset, self.window_days);
        let today = window.today;
        let w = &self.weights;

        let inputs = vec![
            metrics::journaling(atoms, &window, w.journaling),
            metrics::depth(atoms, &window, w.depth),
            metrics::emotional_awareness(atoms, &window, w.emotional_awareness),
            metrics::meditation(atoms, &window, w.meditation),
            metrics::insight(atoms, &window, w.insight),
        ];

        let params = IndexParams {
            now,
            today,
            trend_threshold: self.trend_threshold,
            half_life_hours: self.half_life_hours,
        };
        let (index, components) = assemble_index(&inputs, atoms.newest(REFLECTION_TYPES), params);

        let journals = atoms.of(AtomType::JournalEntry);
        let streaks = vec![
            build_streak(
                StreakCategory::Journaling,
                &active_days(journals, &self.offset, |_| true),
                today,
            ),
            build_streak(
                StreakCategory::Meditation,
                &active_days(atoms.of(AtomType::MeditationSession), &self.offset, |_| true),
                today,
            ),
            build_streak(
                StreakCategory::MoodCheckin,
                &active_days(atoms.of(AtomType::MoodCheckin), &self.offset, |_| true),
                today,
            ),
        ];

        let theme_window = DayWindow::new(now, self.offset, self.themes.weekly_window_days);
        let themes = self.theme_cache.themes(journals, &theme_window, &self.themes);

        let timeline = mood_timeline(atoms.of(AtomType::MoodCheckin), journals, now);
        let buckets = mood_buckets(&timeline, &DayWindow::new(now, self.offset, self.mood_window_days));

        ReflectionSnapshot {
            computed_at: now,
            local_date: today,
            predictions: predictions(&streaks, &components, today),
            index,
            components,
            streaks,
            themes,
            mood_timeline: timeline,
            mood_buckets: buckets,
            grail_insights: metrics::grail_insights(atoms),
        }
    }
}
