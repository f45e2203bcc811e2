//! Narrative predictions
//!
//! Deterministic, human-readable nudges derived from streaks and component
//! trends. No randomness: the same inputs always produce the same messages.

use chrono::{Duration, NaiveDate};

use crate::types::{ComponentScore, Prediction, PredictionKind, Streak, TrendDirection};

/// Streaks this close to a milestone get a milestone prediction
const MILESTONE_HORIZON_DAYS: u32 = 7;

/// Build predictions for a dimension, most urgent first
pub fn predictions(
    streaks: &[Streak],
    components: &[ComponentScore],
    today: NaiveDate,
) -> Vec<Prediction> {
    let mut out = Vec::new();

    for streak in streaks.iter().filter(|s| s.is_endangered) {
        out.push(Prediction {
            kind: PredictionKind::StreakAtRisk,
            subject: streak.name.clone(),
            message: format!(
                "Log {} today to keep your {}-day streak alive",
                streak.name.to_lowercase(),
                streak.current_days
            ),
            eta_date: Some(today),
        });
    }

    for streak in streaks
        .iter()
        .filter(|s| s.current_days > 0 && s.days_to_next_milestone <= MILESTONE_HORIZON_DAYS)
    {
        let target = streak.current_days + streak.days_to_next_milestone;
        // An endangered streak has not counted today yet
        let remaining = streak.days_to_next_milestone as i64 - i64::from(streak.is_endangered);
        let eta = today + Duration::days(remaining);
        out.push(Prediction {
            kind: PredictionKind::MilestoneAhead,
            subject: streak.name.clone(),
            message: format!(
                "{} more day{} to a {}-day {} streak",
                streak.days_to_next_milestone,
                if streak.days_to_next_milestone == 1 { "" } else { "s" },
                target,
                streak.name.to_lowercase()
            ),
            eta_date: Some(eta),
        });
    }

    for component in components {
        let (kind, message) = match component.trend {
            TrendDirection::Declining => (
                PredictionKind::ComponentDeclining,
                format!(
                    "{} has slipped over the last few days",
                    humanize(&component.name)
                ),
            ),
            TrendDirection::Improving => (
                PredictionKind::ComponentImproving,
                format!("{} is trending up", humanize(&component.name)),
            ),
            TrendDirection::Stable => continue,
        };
        out.push(Prediction {
            kind,
            subject: component.name.clone(),
            message,
            eta_date: None,
        });
    }

    out
}

/// `deep_work` → `Deep work`
fn humanize(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ComponentStatus, MetricReading, StreakCategory};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn streak(current: u32, to_next: u32, endangered: bool) -> Streak {
        Streak {
            name: "Journaling".to_string(),
            category: StreakCategory::Journaling,
            current_days: current,
            personal_best: current,
            days_to_next_milestone: to_next,
            is_endangered: endangered,
            xp_per_day: 10,
            milestone_xp: 70,
        }
    }

    fn component(name: &str, trend: TrendDirection) -> ComponentScore {
        ComponentScore {
            name: name.to_string(),
            current_score: 55.0,
            trend,
            status: ComponentStatus::NeedsWork,
            reading: MetricReading::Available(0.55),
        }
    }

    #[test]
    fn test_endangered_streak_comes_first() {
        let out = predictions(&[streak(5, 2, true)], &[], today());

        assert_eq!(out[0].kind, PredictionKind::StreakAtRisk);
        assert_eq!(out[0].eta_date, Some(today()));
        assert_eq!(out[1].kind, PredictionKind::MilestoneAhead);
        assert_eq!(out[1].message, "2 more days to a 7-day journaling streak");
        assert_eq!(out[1].eta_date, Some(today() + Duration::days(1)));
    }

    #[test]
    fn test_active_streak_milestone_eta() {
        let out = predictions(&[streak(6, 1, false)], &[], today());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].message, "1 more day to a 7-day journaling streak");
        // Today already counts; tomorrow completes the milestone
        assert_eq!(out[0].eta_date, Some(today() + Duration::days(1)));
    }

    #[test]
    fn test_far_milestones_and_stable_components_are_quiet() {
        let out = predictions(
            &[streak(31, 29, false), streak(0, 3, false)],
            &[component("sleep", TrendDirection::Stable)],
            today(),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_component_trends() {
        let out = predictions(
            &[],
            &[
                component("deep_work", TrendDirection::Declining),
                component("movement", TrendDirection::Improving),
            ],
            today(),
        );
        assert_eq!(out[0].message, "Deep work has slipped over the last few days");
        assert_eq!(out[1].kind, PredictionKind::ComponentImproving);
    }
}
