//! Behavioral component metrics
//!
//! Each function reads one family of atoms and yields a [`ComponentInput`]:
//! a normalized reading over the trailing window plus a per-day series used
//! for the component trend. A family with no records reads as `NoData`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{FixedOffset, NaiveDate};

use crate::composite::ComponentInput;
use crate::metadata::{self, RoutineKind};
use crate::store::AtomSnapshot;
use crate::temporal::{atom_day, daily_means, daily_sums, fill_missing_days, local_day, DayWindow};
use crate::types::{Atom, AtomType, MetricReading};

/// Daily deep work minutes that score 1.0
pub const DEEP_WORK_TARGET_MINUTES: f64 = 120.0;

/// Nightly sleep that scores 1.0
pub const SLEEP_TARGET_HOURS: f64 = 8.0;

/// Distance from the target at which sleep scores 0.0
const SLEEP_TOLERANCE_HOURS: f64 = 4.0;

/// Share of the sleep score taken by stated quality, when present
const SLEEP_QUALITY_SHARE: f64 = 0.3;

/// Workout days per window that score 1.0
pub const MOVEMENT_TARGET_DAYS: f64 = 5.0;

/// Workout minutes per window that score 1.0
pub const MOVEMENT_TARGET_MINUTES: f64 = 150.0;

/// Minutes that make a full workout day in the daily series
const WORKOUT_DAY_MINUTES: f64 = 30.0;

pub fn is_morning_routine(atom: &Atom) -> bool {
    metadata::routine_kind(atom) == RoutineKind::Morning
}

/// Morning routine: share of window days with a morning routine, each day
/// counted by its best step completion
pub fn morning_routine(atoms: &AtomSnapshot, window: &DayWindow, weight: f64) -> ComponentInput {
    let routines: Vec<&Atom> = atoms
        .of(AtomType::RoutineCompletion)
        .iter()
        .filter(|atom| is_morning_routine(atom))
        .collect();

    let mut best: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for atom in &routines {
        if let Some(day) = atom_day(atom, &window.offset) {
            let slot = best.entry(day).or_insert(0.0);
            *slot = slot.max(metadata::routine_completion(atom));
        }
    }

    let reading = if routines.is_empty() {
        MetricReading::NoData
    } else {
        let total: f64 = best.range(window.start()..=window.today).map(|(_, v)| v).sum();
        MetricReading::from_option(Some(total / f64::from(window.days)))
    };

    ComponentInput {
        name: "morning_routine",
        weight,
        reading,
        daily: fill_missing_days(&best, window.today),
    }
}

/// Deep work: mean daily minutes over the window against the daily target
pub fn deep_work(atoms: &AtomSnapshot, window: &DayWindow, weight: f64) -> ComponentInput {
    let sessions = atoms.of(AtomType::DeepWorkSession);
    let minutes = daily_sums(sessions.iter().filter_map(|atom| {
        let day = atom_day(atom, &window.offset)?;
        Some((day, metadata::duration_minutes(atom).unwrap_or(0.0)))
    }));

    let reading = if sessions.is_empty() {
        MetricReading::NoData
    } else {
        let total: f64 = minutes.range(window.start()..=window.today).map(|(_, v)| v).sum();
        let mean_daily = total / f64::from(window.days);
        MetricReading::from_option(Some(mean_daily / DEEP_WORK_TARGET_MINUTES))
    };

    let normalized: BTreeMap<NaiveDate, f64> = minutes
        .into_iter()
        .map(|(day, m)| (day, (m / DEEP_WORK_TARGET_MINUTES).min(1.0)))
        .collect();

    ComponentInput {
        name: "deep_work",
        weight,
        reading,
        daily: fill_missing_days(&normalized, window.today),
    }
}

/// Sleep: closeness of mean nightly hours to the target, blended with mean
/// stated quality when any record carries one
pub fn sleep(atoms: &AtomSnapshot, window: &DayWindow, weight: f64) -> ComponentInput {
    let records: Vec<(NaiveDate, &Atom)> = atoms
        .of(AtomType::SleepRecord)
        .iter()
        .filter_map(|atom| Some((atom_day(atom, &window.offset)?, atom)))
        .collect();

    let in_window = || records.iter().filter(|(day, _)| window.contains(*day));
    let hours = mean(in_window().filter_map(|(_, atom)| metadata::sleep_hours(atom)));
    let quality = mean(in_window().filter_map(|(_, atom)| metadata::sleep_quality(atom)));
    let reading = MetricReading::from_option(hours.map(|h| sleep_score(h, quality)));

    let daily = daily_means(records.iter().filter_map(|(day, atom)| {
        let hours = metadata::sleep_hours(atom)?;
        Some((*day, sleep_score(hours, metadata::sleep_quality(atom))))
    }));

    ComponentInput {
        name: "sleep",
        weight,
        reading,
        daily,
    }
}

fn sleep_score(hours: f64, quality: Option<f64>) -> f64 {
    let closeness = (1.0 - (hours - SLEEP_TARGET_HOURS).abs() / SLEEP_TOLERANCE_HOURS).clamp(0.0, 1.0);
    match quality {
        Some(q) => closeness * (1.0 - SLEEP_QUALITY_SHARE) + q * SLEEP_QUALITY_SHARE,
        None => closeness,
    }
}

/// Tasks: completed / created among tasks created in the window
pub fn tasks(atoms: &AtomSnapshot, window: &DayWindow, weight: f64) -> ComponentInput {
    let created: Vec<(NaiveDate, bool)> = atoms
        .of(AtomType::Task)
        .iter()
        .filter_map(|atom| Some((atom_day(atom, &window.offset)?, metadata::is_completed(atom))))
        .collect();

    let (window_created, window_completed) = created
        .iter()
        .filter(|(day, _)| window.contains(*day))
        .fold((0u32, 0u32), |(total, done), (_, completed)| {
            (total + 1, done + u32::from(*completed))
        });

    let reading = if window_created == 0 {
        MetricReading::NoData
    } else {
        MetricReading::from_option(Some(f64::from(window_completed) / f64::from(window_created)))
    };

    let daily = daily_means(
        created
            .iter()
            .map(|(day, completed)| (*day, if *completed { 1.0 } else { 0.0 })),
    );

    ComponentInput {
        name: "tasks",
        weight,
        reading,
        daily,
    }
}

/// Screen time after 10pm (no data source yet)
pub fn screen(atoms: &AtomSnapshot, weight: f64) -> ComponentInput {
    ComponentInput {
        name: "screen",
        weight,
        reading: metadata::late_screen_time(atoms.of(AtomType::ScreenTime)),
        daily: BTreeMap::new(),
    }
}

/// Movement: workout days against the weekly target, blended evenly with
/// workout minutes against the weekly target
pub fn movement(atoms: &AtomSnapshot, window: &DayWindow, weight: f64) -> ComponentInput {
    let workouts = atoms.of(AtomType::Workout);
    let days: BTreeSet<NaiveDate> = workouts
        .iter()
        .filter_map(|atom| window.day_of(atom))
        .collect();

    let reading = if workouts.is_empty() {
        MetricReading::NoData
    } else {
        let minutes: f64 = workouts
            .iter()
            .filter(|atom| window.day_of(atom).is_some())
            .filter_map(metadata::duration_minutes)
            .sum();
        let day_part = (days.len() as f64 / MOVEMENT_TARGET_DAYS).min(1.0);
        let minute_part = (minutes / MOVEMENT_TARGET_MINUTES).min(1.0);
        MetricReading::from_option(Some((day_part + minute_part) / 2.0))
    };

    // A workout without a duration counts as a full day
    let per_day = daily_sums(workouts.iter().filter_map(|atom| {
        let day = atom_day(atom, &window.offset)?;
        let value = metadata::duration_minutes(atom)
            .map(|m| m / WORKOUT_DAY_MINUTES)
            .unwrap_or(1.0);
        Some((day, value))
    }));
    let normalized: BTreeMap<NaiveDate, f64> =
        per_day.into_iter().map(|(day, v)| (day, v.min(1.0))).collect();

    ComponentInput {
        name: "movement",
        weight,
        reading,
        daily: fill_missing_days(&normalized, window.today),
    }
}

/// Local days on which at least one task was completed
pub fn task_completion_days(tasks: &[Atom], offset: &FixedOffset) -> BTreeSet<NaiveDate> {
    tasks
        .iter()
        .filter_map(metadata::completion_time)
        .map(|ts| local_day(ts, offset))
        .collect()
}

fn mean<I: Iterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / f64::from(count))
}
