//! Reflection component metrics

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::composite::ComponentInput;
use crate::metadata;
use crate::store::AtomSnapshot;
use crate::temporal::{
    active_days, atom_day, consistency_pct, daily_means, daily_sums, fill_missing_days, DayWindow,
};
use crate::types::{Atom, AtomType, GrailInsight, MetricReading};

/// Journal word count that scores 1.0
pub const DEPTH_TARGET_WORDS: f64 = 250.0;

/// Daily meditation minutes that score 1.0
pub const MEDITATION_TARGET_MINUTES: f64 = 10.0;

/// Trailing days counted for the insight component
pub const INSIGHT_WINDOW_DAYS: u32 = 30;

/// Grail insights per insight window that score 1.0
pub const INSIGHT_TARGET: f64 = 4.0;

fn presence(days: &BTreeSet<NaiveDate>) -> BTreeMap<NaiveDate, f64> {
    days.iter().map(|&day| (day, 1.0)).collect()
}

/// Journaling: consistency over the window
pub fn journaling(atoms: &AtomSnapshot, window: &DayWindow, weight: f64) -> ComponentInput {
    let journals = atoms.of(AtomType::JournalEntry);
    let days = active_days(journals, &window.offset, |_| true);

    let reading = if journals.is_empty() {
        MetricReading::NoData
    } else {
        MetricReading::from_option(Some(consistency_pct(&days, window.today, window.days) / 100.0))
    };

    ComponentInput {
        name: "journaling",
        weight,
        reading,
        daily: fill_missing_days(&presence(&days), window.today),
    }
}

/// Depth: mean word count of entries in the window
pub fn depth(atoms: &AtomSnapshot, window: &DayWindow, weight: f64) -> ComponentInput {
    let words: Vec<(NaiveDate, f64)> = atoms
        .of(AtomType::JournalEntry)
        .iter()
        .filter_map(|atom| {
            let day = atom_day(atom, &window.offset)?;
            Some((day, f64::from(metadata::word_count(atom))))
        })
        .collect();

    let in_window: Vec<f64> = words
        .iter()
        .filter(|(day, _)| window.contains(*day))
        .map(|(_, count)| *count)
        .collect();
    let reading = MetricReading::from_option(
        (!in_window.is_empty())
            .then(|| in_window.iter().sum::<f64>() / in_window.len() as f64 / DEPTH_TARGET_WORDS),
    );

    let daily = daily_means(
        words
            .into_iter()
            .map(|(day, count)| (day, (count / DEPTH_TARGET_WORDS).min(1.0))),
    );

    ComponentInput {
        name: "depth",
        weight,
        reading,
        daily,
    }
}

/// Emotional awareness: share of window days with a mood check-in
pub fn emotional_awareness(atoms: &AtomSnapshot, window: &DayWindow, weight: f64) -> ComponentInput {
    let checkins = atoms.of(AtomType::MoodCheckin);
    let days = active_days(checkins, &window.offset, |_| true);

    let reading = if checkins.is_empty() {
        MetricReading::NoData
    } else {
        let logged = days.range(window.start()..=window.today).count();
        MetricReading::from_option(Some(logged as f64 / f64::from(window.days)))
    };

    ComponentInput {
        name: "emotional_awareness",
        weight,
        reading,
        daily: fill_missing_days(&presence(&days), window.today),
    }
}

/// Meditation: mean daily minutes against the target, blended evenly with the
/// share of window days practised
pub fn meditation(atoms: &AtomSnapshot, window: &DayWindow, weight: f64) -> ComponentInput {
    let sessions = atoms.of(AtomType::MeditationSession);
    let minutes = daily_sums(sessions.iter().filter_map(|atom| {
        let day = atom_day(atom, &window.offset)?;
        Some((day, metadata::duration_minutes(atom).unwrap_or(0.0)))
    }));

    let reading = if sessions.is_empty() {
        MetricReading::NoData
    } else {
        let recent = minutes.range(window.start()..=window.today);
        let (total, days) = recent.fold((0.0, 0u32), |(total, days), (_, m)| (total + m, days + 1));
        let window_days = f64::from(window.days);
        let minute_part = (total / window_days / MEDITATION_TARGET_MINUTES).min(1.0);
        let day_part = f64::from(days) / window_days;
        MetricReading::from_option(Some((minute_part + day_part) / 2.0))
    };

    let normalized: BTreeMap<NaiveDate, f64> = minutes
        .into_iter()
        .map(|(day, m)| (day, (m / MEDITATION_TARGET_MINUTES).min(1.0)))
        .collect();

    ComponentInput {
        name: "meditation",
        weight,
        reading,
        daily: fill_missing_days(&normalized, window.today),
    }
}

/// Insight: grail insights in the trailing insight window against the target
pub fn insight(atoms: &AtomSnapshot, window: &DayWindow, weight: f64) -> ComponentInput {
    let journals = atoms.of(AtomType::JournalEntry);
    let grails = atoms.of(AtomType::GrailInsight);

    let reading = if journals.is_empty() && grails.is_empty() {
        MetricReading::NoData
    } else {
        let insight_window = DayWindow {
            days: INSIGHT_WINDOW_DAYS,
            ..*window
        };
        let count = grails
            .iter()
            .chain(journals)
            .filter(|atom| metadata::is_grail(atom))
            .filter(|atom| insight_window.day_of(atom).is_some())
            .count();
        MetricReading::from_option(Some(count as f64 / INSIGHT_TARGET))
    };

    ComponentInput {
        name: "insight",
        weight,
        reading,
        daily: BTreeMap::new(),
    }
}

/// Grail insights from dedicated records and flagged journals, newest first.
///
/// Records without a parseable timestamp are skipped.
pub fn grail_insights(atoms: &AtomSnapshot) -> Vec<GrailInsight> {
    let mut insights: Vec<GrailInsight> = atoms
        .of(AtomType::GrailInsight)
        .iter()
        .chain(atoms.of(AtomType::JournalEntry))
        .filter(|atom| metadata::is_grail(atom))
        .filter_map(|atom: &Atom| {
            Some(GrailInsight {
                atom_id: atom.id.clone(),
                title: atom.title.clone(),
                created_at: atom.created_at_utc()?,
                linked_dimensions: metadata::linked_dimensions(atom),
            })
        })
        .collect();

    insights.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.atom_id.cmp(&b.atom_id))
    });
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 20, 0, 0).unwrap()
    }

    fn window() -> DayWindow {
        DayWindow::new(now(), FixedOffset::east_opt(0).unwrap(), 7)
    }

    fn atom(id: &str, atom_type: AtomType, days_ago: i64, metadata: serde_json::Value) -> Atom {
        Atom {
            id: id.to_string(),
            atom_type,
            title: format!("title {id}"),
            body: None,
            metadata: Some(metadata),
            created_at: (now() - Duration::days(days_ago) - Duration::hours(1)).to_rfc3339(),
            is_deleted: false,
        }
    }

    fn approx(reading: MetricReading, expected: f64) {
        let value = reading.value().expect("reading should be available");
        assert!((value - expected).abs() < 1e-9, "{value} != {expected}");
    }

    #[test]
    fn test_journaling_consistency() {
        let atoms = AtomSnapshot::from_atoms(vec![
            atom("a", AtomType::JournalEntry, 0, json!({})),
            atom("b", AtomType::JournalEntry, 0, json!({})),
            atom("c", AtomType::JournalEntry, 3, json!({})),
            atom("d", AtomType::JournalEntry, 20, json!({})),
        ]);
        let input = journaling(&atoms, &window(), 0.3);
        approx(input.reading, 2.0 / 7.0);
        assert_eq!(input.daily[&(window().today - Duration::days(1))], 0.0);
    }

    #[test]
    fn test_depth_uses_word_counts() {
        let atoms = AtomSnapshot::from_atoms(vec![
            atom("a", AtomType::JournalEntry, 0, json!({ "wordCount": 500 })),
            atom("b", AtomType::JournalEntry, 1, json!({ "wordCount": 100 })),
            atom("c", AtomType::JournalEntry, 30, json!({ "wordCount": 10 })),
        ]);
        let input = depth(&atoms, &window(), 0.25);
        // Mean 300 words, capped at 1.0
        approx(input.reading, 1.0);
        assert_eq!(input.daily[&window().today], 1.0);
        assert!((input.daily[&(window().today - Duration::days(1))] - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_emotional_awareness_and_meditation() {
        let atoms = AtomSnapshot::from_atoms(vec![
            atom("m1", AtomType::MoodCheckin, 0, json!({ "valence": 0.5 })),
            atom("m2", AtomType::MoodCheckin, 2, json!({})),
            atom("s1", AtomType::MeditationSession, 0, json!({ "durationMinutes": 35 })),
            atom("s2", AtomType::MeditationSession, 1, json!({})),
        ]);
        approx(emotional_awareness(&atoms, &window(), 0.2).reading, 2.0 / 7.0);
        // 35 minutes over 7 days is half the target; practised 2 of 7 days
        approx(meditation(&atoms, &window(), 0.15).reading, (0.5 + 2.0 / 7.0) / 2.0);
    }

    #[test]
    fn test_insight_counts_recent_grails() {
        let atoms = AtomSnapshot::from_atoms(vec![
            atom("g1", AtomType::GrailInsight, 2, json!({ "linkedDimensions": ["behavioral"] })),
            atom("g2", AtomType::GrailInsight, 45, json!({})),
            atom("j1", AtomType::JournalEntry, 10, json!({ "isGrail": true })),
            atom("j2", AtomType::JournalEntry, 1, json!({})),
        ]);
        approx(insight(&atoms, &window(), 0.1).reading, 0.5);

        let insights = grail_insights(&atoms);
        let ids: Vec<&str> = insights.iter().map(|g| g.atom_id.as_str()).collect();
        assert_eq!(ids, vec!["g1", "j1", "g2"]);
        assert_eq!(insights[0].linked_dimensions, vec!["behavioral".to_string()]);
        assert_eq!(insights[0].title, "title g1");
    }

    #[test]
    fn test_no_reflection_data() {
        let atoms = AtomSnapshot::default();
        assert_eq!(journaling(&atoms, &window(), 0.3).reading, MetricReading::NoData);
        assert_eq!(depth(&atoms, &window(), 0.25).reading, MetricReading::NoData);
        assert_eq!(insight(&atoms, &window(), 0.1).reading, MetricReading::NoData);
        assert!(grail_insights(&atoms).is_empty());
    }
}
