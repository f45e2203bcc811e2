//! Composite scoring
//!
//! Combines named sub-scores with fixed weights into a single 0-100 index.
//! Unavailable sub-scores are excluded from both numerator and denominator so
//! their weight is redistributed over the readings that do exist. Confidence
//! reflects how much of the total weight was available and how fresh the
//! underlying data is.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::temporal::trend_direction;
use crate::types::{
    ComponentScore, ComponentStatus, DimensionIndex, IndexTrend, MetricReading, TrendDirection,
};

/// Score reported when no sub-score is available
pub const NEUTRAL_SCORE: f64 = 50.0;

/// One weighted input to the composite
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedReading {
    pub name: &'static str,
    pub reading: MetricReading,
    pub weight: f64,
}

impl WeightedReading {
    pub fn new(name: &'static str, reading: MetricReading, weight: f64) -> Self {
        Self {
            name,
            reading,
            weight,
        }
    }
}

/// Result of combining weighted readings
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeScore {
    /// 0-100
    pub score: f64,
    /// Share of total weight with an available reading (0-1)
    pub weight_coverage: f64,
    /// Available sub-scores on a 0-100 scale
    pub sub_scores: BTreeMap<String, f64>,
}

/// Weighted mean of `(sub_score 0-1, weight 0-1)` pairs scaled to 0-100.
///
/// Returns `None` when the total weight is zero.
pub fn weighted_score(pairs: &[(f64, f64)]) -> Option<f64> {
    let (numerator, denominator) = pairs
        .iter()
        .filter(|(value, weight)| value.is_finite() && weight.is_finite() && *weight > 0.0)
        .fold((0.0, 0.0), |(num, den), (value, weight)| {
            (num + value.clamp(0.0, 1.0) * weight, den + weight)
        });

    if denominator <= 0.0 {
        return None;
    }
    Some((numerator / denominator * 100.0).clamp(0.0, 100.0))
}

/// Combine readings, redistributing the weight of unavailable ones
pub fn combine(readings: &[WeightedReading]) -> CompositeScore {
    let total_weight: f64 = readings.iter().map(|r| r.weight.max(0.0)).sum();

    let available: Vec<(&WeightedReading, f64)> = readings
        .iter()
        .filter_map(|r| r.reading.value().map(|v| (r, v)))
        .collect();

    let pairs: Vec<(f64, f64)> = available.iter().map(|(r, v)| (*v, r.weight)).collect();
    let available_weight: f64 = available.iter().map(|(r, _)| r.weight.max(0.0)).sum();

    let sub_scores = available
        .iter()
        .map(|(r, v)| (r.name.to_string(), (v * 100.0).clamp(0.0, 100.0)))
        .collect();

    let weight_coverage = if total_weight > 0.0 {
        (available_weight / total_weight).clamp(0.0, 1.0)
    } else {
        0.0
    };

    CompositeScore {
        score: weighted_score(&pairs).unwrap_or(NEUTRAL_SCORE),
        weight_coverage,
        sub_scores,
    }
}

/// Exponential staleness factor: `0.5^(age_hours / half_life_hours)`.
///
/// Data from the future counts as fresh.
pub fn staleness_factor(age_seconds: i64, half_life_hours: f64) -> f64 {
    if half_life_hours <= 0.0 {
        return 0.0;
    }
    let age_hours = age_seconds.max(0) as f64 / 3600.0;
    0.5_f64.powf(age_hours / half_life_hours).clamp(0.0, 1.0)
}

/// Age of the newest data point relative to `now`
pub fn data_age_seconds(newest: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<i64> {
    newest.map(|ts| (now - ts).num_seconds().max(0))
}

/// Confidence from weight coverage and data freshness (0-1)
pub fn confidence(weight_coverage: f64, age_seconds: Option<i64>, half_life_hours: f64) -> f64 {
    match age_seconds {
        Some(age) => (weight_coverage * staleness_factor(age, half_life_hours)).clamp(0.0, 1.0),
        None => 0.0,
    }
}

/// Status bucket for a 0-100 score
pub fn classify(score: f64) -> ComponentStatus {
    if score >= 80.0 {
        ComponentStatus::Excellent
    } else if score >= 60.0 {
        ComponentStatus::Good
    } else if score >= 40.0 {
        ComponentStatus::NeedsWork
    } else {
        ComponentStatus::AtRisk
    }
}

/// One component of a dimension: its window reading plus a per-day series
/// (normalized 0-1) used for trends
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentInput {
    pub name: &'static str,
    pub weight: f64,
    pub reading: MetricReading,
    pub daily: BTreeMap<NaiveDate, f64>,
}

/// Display score of a component; neutral when the reading is unavailable
pub fn component_score(name: &str, reading: MetricReading, trend: TrendDirection) -> ComponentScore {
    let current_score = reading
        .value()
        .map(|v| (v * 100.0).clamp(0.0, 100.0))
        .unwrap_or(NEUTRAL_SCORE);
    ComponentScore {
        name: name.to_string(),
        current_score,
        trend,
        status: classify(current_score),
        reading,
    }
}

/// Per-day composite (0-1) over whichever components have a value that day
pub fn daily_composite(components: &[ComponentInput]) -> BTreeMap<NaiveDate, f64> {
    let days: std::collections::BTreeSet<NaiveDate> = components
        .iter()
        .flat_map(|c| c.daily.keys().copied())
        .collect();

    days.into_iter()
        .filter_map(|day| {
            let pairs: Vec<(f64, f64)> = components
                .iter()
                .filter_map(|c| c.daily.get(&day).map(|v| (*v, c.weight)))
                .collect();
            weighted_score(&pairs).map(|score| (day, score / 100.0))
        })
        .collect()
}

/// Parameters shared by every index assembly
#[derive(Debug, Clone, Copy)]
pub struct IndexParams {
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
    pub trend_threshold: f64,
    pub half_life_hours: f64,
}

/// Assemble a dimension index and its component scores
pub fn assemble_index(
    components: &[ComponentInput],
    newest: Option<DateTime<Utc>>,
    params: IndexParams,
) -> (DimensionIndex, Vec<ComponentScore>) {
    let readings: Vec<WeightedReading> = components
        .iter()
        .map(|c| WeightedReading::new(c.name, c.reading, c.weight))
        .collect();
    let composite = combine(&readings);

    let scores = components
        .iter()
        .map(|c| {
            let trend = trend_direction(&c.daily, params.today, params.trend_threshold);
            component_score(c.name, c.reading, trend)
        })
        .collect();

    let index_trend = trend_direction(
        &daily_composite(components),
        params.today,
        params.trend_threshold,
    );
    let data_age = data_age_seconds(newest, params.now);

    let index = DimensionIndex {
        score: composite.score,
        confidence: confidence(composite.weight_coverage, data_age, params.half_life_hours),
        trend: IndexTrend::from(index_trend),
        sub_scores: composite.sub_scores,
        data_age_seconds: data_age,
    };
    (index, scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_weighted_score_formula() {
        let score = weighted_score(&[(1.0, 0.25), (0.5, 0.25), (0.0, 0.5)]).unwrap();
        assert!((score - 37.5).abs() < 1e-9);
        assert_eq!(weighted_score(&[]), None);
        assert_eq!(weighted_score(&[(0.7, 0.0)]), None);
    }

    #[test]
    fn test_unavailable_weight_is_redistributed() {
        let readings = vec![
            WeightedReading::new("deep_work", MetricReading::Available(0.8), 0.25),
            WeightedReading::new("screen", MetricReading::Unimplemented, 0.10),
            WeightedReading::new("sleep", MetricReading::NoData, 0.15),
            WeightedReading::new("tasks", MetricReading::Available(0.4), 0.20),
        ];

        let composite = combine(&readings);

        // (0.8*0.25 + 0.4*0.20) / 0.45
        let expected = (0.8 * 0.25 + 0.4 * 0.20) / 0.45 * 100.0;
        assert!((composite.score - expected).abs() < 1e-9);
        assert!((composite.weight_coverage - 0.45 / 0.70).abs() < 1e-9);
        assert_eq!(
            composite.sub_scores.keys().cloned().collect::<Vec<_>>(),
            vec!["deep_work".to_string(), "tasks".to_string()]
        );
    }

    #[test]
    fn test_no_available_readings_is_neutral() {
        let readings = vec![WeightedReading::new("screen", MetricReading::Unimplemented, 0.1)];
        let composite = combine(&readings);
        assert_eq!(composite.score, NEUTRAL_SCORE);
        assert_eq!(composite.weight_coverage, 0.0);
        assert!(composite.sub_scores.is_empty());
    }

    #[test]
    fn test_staleness_decay() {
        assert_eq!(staleness_factor(0, 72.0), 1.0);
        assert!((staleness_factor(72 * 3600, 72.0) - 0.5).abs() < 1e-9);
        assert_eq!(staleness_factor(-100, 72.0), 1.0);
        assert_eq!(confidence(1.0, None, 72.0), 0.0);
        assert!((confidence(0.5, Some(0), 72.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(classify(80.0), ComponentStatus::Excellent);
        assert_eq!(classify(79.9), ComponentStatus::Good);
        assert_eq!(classify(60.0), ComponentStatus::Good);
        assert_eq!(classify(40.0), ComponentStatus::NeedsWork);
        assert_eq!(classify(39.9), ComponentStatus::AtRisk);
    }

    #[test]
    fn test_component_score_neutral_when_unavailable() {
        let score = component_score("screen", MetricReading::Unimplemented, TrendDirection::Stable);
        assert_eq!(score.current_score, NEUTRAL_SCORE);
        assert_eq!(score.status, ComponentStatus::NeedsWork);

        let available =
            component_score("sleep", MetricReading::Available(0.9), TrendDirection::Improving);
        assert!((available.current_score - 90.0).abs() < 1e-9);
        assert_eq!(available.status, ComponentStatus::Excellent);
    }

    #[test]
    fn test_assemble_index_trend_and_confidence() {
        use chrono::{Duration, TimeZone};

        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let today = now.date_naive();
        let rising: BTreeMap<NaiveDate, f64> = [
            (today, 1.0),
            (today - Duration::days(1), 0.9),
            (today - Duration::days(4), 0.2),
            (today - Duration::days(5), 0.1),
        ]
        .into_iter()
        .collect();

        let components = vec![
            ComponentInput {
                name: "deep_work",
                weight: 0.5,
                reading: MetricReading::Available(0.6),
                daily: rising,
            },
            ComponentInput {
                name: "screen",
                weight: 0.5,
                reading: MetricReading::Unimplemented,
                daily: BTreeMap::new(),
            },
        ];
        let params = IndexParams {
            now,
            today,
            trend_threshold: 0.15,
            half_life_hours: 72.0,
        };

        let (index, scores) = assemble_index(&components, Some(now), params);

        assert!((index.score - 60.0).abs() < 1e-9);
        assert!((index.confidence - 0.5).abs() < 1e-9);
        assert_eq!(index.trend, IndexTrend::Rising);
        assert_eq!(index.data_age_seconds, Some(0));
        assert_eq!(scores[0].trend, TrendDirection::Improving);
        assert_eq!(scores[1].trend, TrendDirection::Stable);

        let (empty, _) = assemble_index(&components[1..], None, params);
        assert_eq!(empty.score, NEUTRAL_SCORE);
        assert_eq!(empty.confidence, 0.0);
        assert_eq!(empty.data_age_seconds, None);
    }

    proptest! {
        #[test]
        fn prop_composite_within_bounds(pairs in proptest::collection::vec((0.0f64..=1.0, 0.0f64..=1.0), 0..8)) {
            if let Some(score) = weighted_score(&pairs) {
                prop_assert!((0.0..=100.0).contains(&score));
            }
        }

        #[test]
        fn prop_unavailable_reading_is_redistributed(
            pairs in proptest::collection::vec((0.0f64..=1.0, 0.01f64..=1.0), 3..8),
            removed in 0usize..8,
        ) {
            const NAMES: [&str; 8] = ["a", "b", "c", "d", "e", "f", "g", "h"];
            let removed = removed % pairs.len();

            let full: Vec<WeightedReading> = pairs
                .iter()
                .enumerate()
                .map(|(i, (v, w))| WeightedReading::new(NAMES[i], MetricReading::Available(*v), *w))
                .collect();
            let mut reduced = full.clone();
            reduced[removed].reading = MetricReading::NoData;

            let before = combine(&full);
            let after = combine(&reduced);

            let remaining: Vec<(usize, f64, f64)> = pairs
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != removed)
                .map(|(i, (v, w))| (i, *v, *w))
                .collect();
            let remaining_weight: f64 = remaining.iter().map(|(_, _, w)| w).sum();
            let expected =
                remaining.iter().map(|(_, v, w)| v * w).sum::<f64>() / remaining_weight * 100.0;

            prop_assert!((after.score - expected).abs() < 1e-9);
            prop_assert!(!after.sub_scores.contains_key(NAMES[removed]));
            prop_assert_eq!(after.sub_scores.len(), pairs.len() - 1);

            // Normalized contributions of the remaining readings keep their order
            let total_weight: f64 = pairs.iter().map(|(_, w)| w).sum();
            let contribution = |scores: &BTreeMap<String, f64>, i: usize, denominator: f64| {
                scores[NAMES[i]] / 100.0 * pairs[i].1 / denominator
            };
            for &(i, _, _) in &remaining {
                for &(j, _, _) in &remaining {
                    if contribution(&before.sub_scores, i, total_weight)
                        < contribution(&before.sub_scores, j, total_weight)
                    {
                        prop_assert!(
                            contribution(&after.sub_scores, i, remaining_weight)
                                <= contribution(&after.sub_scores, j, remaining_weight)
                        );
                    }
                }
            }
        }
    }
}
