//! Temporal aggregation
//!
//! Groups extracted features by local calendar day and computes streaks,
//! consistency percentages and trend direction. Every function takes its "now"
//! (or "today") explicitly.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};

use crate::types::{Atom, TrendDirection};

/// Days in the recent trend window (today, today-1, today-2)
pub const RECENT_WINDOW_DAYS: i64 = 3;

/// Days in the prior trend window (today-3 through today-6)
pub const PRIOR_WINDOW_DAYS: i64 = 4;

/// Calendar day of a timestamp in the local offset
pub fn local_day(timestamp: DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    timestamp.with_timezone(offset).date_naive()
}

/// Local day of an atom; `None` when its timestamp does not parse
pub fn atom_day(atom: &Atom, offset: &FixedOffset) -> Option<NaiveDate> {
    atom.created_at_utc().map(|ts| local_day(ts, offset))
}

/// Trailing window of local days ending on `today` (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub offset: FixedOffset,
    pub today: NaiveDate,
    pub days: u32,
}

impl DayWindow {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset, days: u32) -> Self {
        Self {
            offset,
            today: local_day(now, &offset),
            days: days.max(1),
        }
    }

    /// First day of the window
    pub fn start(&self) -> NaiveDate {
        self.today
            .checked_sub_signed(Duration::days(i64::from(self.days) - 1))
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start() && day <= self.today
    }

    /// Local day of an atom when it falls inside the window
    pub fn day_of(&self, atom: &Atom) -> Option<NaiveDate> {
        atom_day(atom, &self.offset).filter(|day| self.contains(*day))
    }
}

/// Distinct local days on which at least one atom satisfies `qualifies`
pub fn active_days<'a, I, F>(atoms: I, offset: &FixedOffset, qualifies: F) -> BTreeSet<NaiveDate>
where
    I: IntoIterator<Item = &'a Atom>,
    F: Fn(&Atom) -> bool,
{
    atoms
        .into_iter()
        .filter(|atom| qualifies(atom))
        .filter_map(|atom| atom_day(atom, offset))
        .collect()
}

/// Current streak length.
///
/// Anchors on `today`, or on yesterday when today has no entry yet, and walks
/// backward while consecutive days are present.
pub fn compute_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let yesterday = today - Duration::days(1);
    let mut cursor = if days.contains(&today) {
        today
    } else if days.contains(&yesterday) {
        yesterday
    } else {
        return 0;
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}

/// Longest run of consecutive days anywhere in the set
pub fn personal_best_streak(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut best = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for &day in days {
        run = match previous {
            Some(prev) if day - prev == Duration::days(1) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        previous = Some(day);
    }
    best
}

/// Share of the trailing `window_days` (today inclusive) with activity, as a
/// percentage clamped to 100
pub fn consistency_pct(days: &BTreeSet<NaiveDate>, today: NaiveDate, window_days: u32) -> f64 {
    if window_days == 0 {
        return 0.0;
    }
    let start = today - Duration::days(window_days as i64 - 1);
    let active = days.range(start..=today).count();
    (active as f64 / window_days as f64 * 100.0).min(100.0)
}

/// Fold `(day, value)` pairs into a per-day mean series
pub fn daily_means<I>(points: I) -> BTreeMap<NaiveDate, f64>
where
    I: IntoIterator<Item = (NaiveDate, f64)>,
{
    let mut sums: BTreeMap<NaiveDate, (f64, u32)> = BTreeMap::new();
    for (day, value) in points {
        if !value.is_finite() {
            continue;
        }
        let entry = sums.entry(day).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(day, (sum, count))| (day, sum / count as f64))
        .collect()
}

/// Fold `(day, value)` pairs into a per-day sum series
pub fn daily_sums<I>(points: I) -> BTreeMap<NaiveDate, f64>
where
    I: IntoIterator<Item = (NaiveDate, f64)>,
{
    let mut sums: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (day, value) in points {
        if value.is_finite() {
            *sums.entry(day).or_insert(0.0) += value;
        }
    }
    sums
}

/// Fill the days of the trend span (today and the 6 days before it) that are
/// missing from `series` with 0.0.
///
/// Days before the first entry of the series are left empty so a new habit
/// does not read as a decline.
pub fn fill_missing_days(series: &BTreeMap<NaiveDate, f64>, today: NaiveDate) -> BTreeMap<NaiveDate, f64> {
    let mut filled = series.clone();
    let Some(&first) = series.keys().next() else {
        return filled;
    };

    let span_start = today - Duration::days(RECENT_WINDOW_DAYS + PRIOR_WINDOW_DAYS - 1);
    let mut cursor = span_start.max(first);
    while cursor <= today {
        filled.entry(cursor).or_insert(0.0);
        cursor += Duration::days(1);
    }
    filled
}

/// Trend of a daily series: mean of the last 3 days against the mean of the 4
/// days before them.
///
/// Either window being empty yields `Stable`.
pub fn trend_direction(
    series: &BTreeMap<NaiveDate, f64>,
    today: NaiveDate,
    threshold: f64,
) -> TrendDirection {
    let recent_start = today - Duration::days(RECENT_WINDOW_DAYS - 1);
    let prior_end = recent_start - Duration::days(1);
    let prior_start = prior_end - Duration::days(PRIOR_WINDOW_DAYS - 1);

    let recent = window_mean(series, recent_start, today);
    let prior = window_mean(series, prior_start, prior_end);

    match (recent, prior) {
        (Some(recent), Some(prior)) => {
            let delta = recent - prior;
            if delta > threshold {
                TrendDirection::Improving
            } else if delta < -threshold {
                TrendDirection::Declining
            } else {
                TrendDirection::Stable
            }
        }
        _ => TrendDirection::Stable,
    }
}

fn window_mean(series: &BTreeMap<NaiveDate, f64>, start: NaiveDate, end: NaiveDate) -> Option<f64> {
    let values: Vec<f64> = series.range(start..=end).map(|(_, v)| *v).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Whether a timestamp falls within the trailing `days` before `now`
pub fn within_days(timestamp: DateTime<Utc>, now: DateTime<Utc>, days: i64) -> bool {
    timestamp <= now && now - timestamp < Duration::days(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap() + Duration::days(offset)
    }

    fn days(offsets: &[i64]) -> BTreeSet<NaiveDate> {
        offsets.iter().map(|&o| day(o)).collect()
    }

    #[test]
    fn test_streak_counts_consecutive_days() {
        let today = day(0);
        assert_eq!(compute_streak(&days(&[0, -1, -2]), today), 3);
        // Removing yesterday breaks the run
        assert_eq!(compute_streak(&days(&[0, -2]), today), 1);
    }

    #[test]
    fn test_streak_falls_back_to_yesterday() {
        let today = day(0);
        assert_eq!(compute_streak(&days(&[-1, -2, -3]), today), 3);
        assert_eq!(compute_streak(&days(&[-2, -3]), today), 0);
        assert_eq!(compute_streak(&BTreeSet::new(), today), 0);
    }

    #[test]
    fn test_personal_best_scans_all_runs() {
        let set = days(&[-20, -19, -18, -17, -10, -1, 0]);
        assert_eq!(personal_best_streak(&set), 4);
        assert_eq!(compute_streak(&set, day(0)), 2);
        assert_eq!(personal_best_streak(&BTreeSet::new()), 0);
    }

    #[test]
    fn test_consistency_pct() {
        let today = day(0);
        let set = days(&[0, -1, -3, -6, -7, -30]);
        // Window covers today..today-6: 0, -1, -3, -6
        assert!((consistency_pct(&set, today, 7) - 400.0 / 7.0).abs() < 1e-9);
        assert_eq!(consistency_pct(&set, today, 0), 0.0);
        assert_eq!(consistency_pct(&days(&[0]), today, 1), 100.0);
    }

    #[test]
    fn test_trend_improving_and_declining() {
        let today = day(0);
        let improving: BTreeMap<_, _> = [(day(0), 0.9), (day(-1), 0.8), (day(-4), 0.3), (day(-6), 0.4)]
            .into_iter()
            .collect();
        assert_eq!(trend_direction(&improving, today, 0.15), TrendDirection::Improving);

        let declining: BTreeMap<_, _> = [(day(-2), 0.2), (day(-3), 0.9)].into_iter().collect();
        assert_eq!(trend_direction(&declining, today, 0.15), TrendDirection::Declining);

        let flat: BTreeMap<_, _> = [(day(0), 0.5), (day(-5), 0.45)].into_iter().collect();
        assert_eq!(trend_direction(&flat, today, 0.15), TrendDirection::Stable);
    }

    #[test]
    fn test_trend_stable_on_sparse_windows() {
        let today = day(0);
        let recent_only: BTreeMap<_, _> = [(day(0), 1.0)].into_iter().collect();
        assert_eq!(trend_direction(&recent_only, today, 0.15), TrendDirection::Stable);

        let prior_only: BTreeMap<_, _> = [(day(-5), 0.0)].into_iter().collect();
        assert_eq!(trend_direction(&prior_only, today, 0.15), TrendDirection::Stable);

        // Points older than the prior window do not count
        let too_old: BTreeMap<_, _> = [(day(0), 1.0), (day(-7), 0.0)].into_iter().collect();
        assert_eq!(trend_direction(&too_old, today, 0.15), TrendDirection::Stable);
    }

    #[test]
    fn test_local_day_respects_offset() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 15, 23, 30, 0).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        assert_eq!(local_day(ts, &utc), day(0));
        assert_eq!(local_day(ts, &tokyo), day(1));
    }

    #[test]
    fn test_active_days_skips_unparseable_dates() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let make = |created_at: &str| Atom {
            id: created_at.to_string(),
            atom_type: crate::types::AtomType::Workout,
            title: String::new(),
            body: None,
            metadata: None,
            created_at: created_at.to_string(),
            is_deleted: false,
        };
        let atoms = vec![
            make("2024-03-15T08:00:00Z"),
            make("2024-03-15T18:00:00Z"),
            make("not a date"),
        ];
        let set = active_days(&atoms, &utc, |_| true);
        assert_eq!(set, days(&[0]));
    }

    #[test]
    fn test_daily_means_and_sums() {
        let points = vec![(day(0), 1.0), (day(0), 0.0), (day(-1), 0.4), (day(-1), f64::NAN)];
        let means = daily_means(points.clone());
        assert_eq!(means[&day(0)], 0.5);
        assert_eq!(means[&day(-1)], 0.4);

        let sums = daily_sums(points);
        assert_eq!(sums[&day(0)], 1.0);
    }

    #[test]
    fn test_day_window_bounds() {
        let offset = FixedOffset::east_opt(-5 * 3600).unwrap();
        // 03:00 UTC on the 16th is still the 15th locally
        let now = Utc.with_ymd_and_hms(2024, 3, 16, 3, 0, 0).unwrap();
        let window = DayWindow::new(now, offset, 7);

        assert_eq!(window.today, day(0));
        assert_eq!(window.start(), day(-6));
        assert!(window.contains(day(-6)));
        assert!(!window.contains(day(-7)));
        assert!(!window.contains(day(1)));
    }

    #[test]
    fn test_day_window_start_saturates() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let window = DayWindow::new(now, FixedOffset::east_opt(0).unwrap(), u32::MAX);
        assert_eq!(window.start(), NaiveDate::MIN);
        assert!(window.contains(day(-10_000)));
    }

    #[test]
    fn test_fill_missing_days() {
        let today = day(0);
        let series: BTreeMap<_, _> = [(day(-4), 1.0), (day(-1), 0.5)].into_iter().collect();
        let filled = fill_missing_days(&series, today);

        assert_eq!(filled.len(), 5);
        assert_eq!(filled[&day(-3)], 0.0);
        assert_eq!(filled[&day(-1)], 0.5);
        assert!(!filled.contains_key(&day(-5)));

        assert!(fill_missing_days(&BTreeMap::new(), today).is_empty());
    }

    #[test]
    fn test_within_days() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        assert!(within_days(now - Duration::days(6), now, 7));
        assert!(!within_days(now - Duration::days(7), now, 7));
        assert!(!within_days(now + Duration::hours(1), now, 7));
    }

    proptest! {
        #[test]
        fn prop_personal_best_at_least_current(offsets in proptest::collection::btree_set(-60i64..=0, 0..40)) {
            let set: BTreeSet<NaiveDate> = offsets.iter().map(|&o| day(o)).collect();
            prop_assert!(personal_best_streak(&set) >= compute_streak(&set, day(0)));
        }

        #[test]
        fn prop_streak_never_drops_when_today_logged(offsets in proptest::collection::btree_set(-60i64..=0, 0..40)) {
            let mut set: BTreeSet<NaiveDate> = offsets.iter().map(|&o| day(o)).collect();
            let before = compute_streak(&set, day(0));
            set.insert(day(0));
            prop_assert!(compute_streak(&set, day(0)) >= before);
        }

        #[test]
        fn prop_trend_stable_without_recent_days(
            prior in proptest::collection::btree_map(-6i64..=-3, 0.0f64..=1.0, 0..4),
            threshold in 0.0f64..=1.0,
        ) {
            let series: BTreeMap<NaiveDate, f64> = prior.iter().map(|(&o, &v)| (day(o), v)).collect();
            prop_assert_eq!(trend_direction(&series, day(0), threshold), TrendDirection::Stable);
        }

        #[test]
        fn prop_trend_stable_without_prior_days(
            recent in proptest::collection::btree_map(-2i64..=0, 0.0f64..=1.0, 0..3),
            threshold in 0.0f64..=1.0,
        ) {
            let series: BTreeMap<NaiveDate, f64> = recent.iter().map(|(&o, &v)| (day(o), v)).collect();
            prop_assert_eq!(trend_direction(&series, day(0), threshold), TrendDirection::Stable);
        }

        #[test]
        fn prop_consistency_within_bounds(offsets in proptest::collection::btree_set(-60i64..=0, 0..40), window in 1u32..60) {
            let set: BTreeSet<NaiveDate> = offsets.iter().map(|&o| day(o)).collect();
            let pct = consistency_pct(&set, day(0), window);
            prop_assert!((0.0..=100.0).contains(&pct));
        }
    }
}
