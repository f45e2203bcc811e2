//! Streak assembly
//!
//! Turns the set of active days for a category into a display-ready
//! [`Streak`]. Streaks are recomputed wholesale on each refresh.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::temporal::{compute_streak, personal_best_streak};
use crate::types::{Streak, StreakCategory};

/// Milestones in days; past the last one, every further year is a milestone
pub const MILESTONES: [u32; 9] = [3, 7, 14, 21, 30, 60, 90, 180, 365];

/// XP awarded per milestone day
const MILESTONE_XP_PER_DAY: u32 = 10;

/// Maximum number of weekly XP bonuses (each +25% of base)
const MAX_WEEKLY_BONUSES: u32 = 4;

impl StreakCategory {
    /// Display name
    pub fn display_name(&self) -> &'static str {
        match self {
            StreakCategory::DeepWork => "Deep Work",
            StreakCategory::Movement => "Movement",
            StreakCategory::MorningRoutine => "Morning Routine",
            StreakCategory::TaskCompletion => "Task Completion",
            StreakCategory::Journaling => "Journaling",
            StreakCategory::Meditation => "Meditation",
            StreakCategory::MoodCheckin => "Mood Check-in",
        }
    }

    /// XP earned per active day before streak bonuses
    pub fn base_xp(&self) -> u32 {
        match self {
            StreakCategory::DeepWork => 20,
            StreakCategory::Movement | StreakCategory::Meditation => 15,
            StreakCategory::MorningRoutine
            | StreakCategory::TaskCompletion
            | StreakCategory::Journaling => 10,
            StreakCategory::MoodCheckin => 5,
        }
    }
}

/// Smallest milestone strictly above `current`
pub fn next_milestone(current: u32) -> u32 {
    MILESTONES
        .iter()
        .copied()
        .find(|&m| m > current)
        .unwrap_or_else(|| (current / 365 + 1) * 365)
}

/// XP per day: base plus 25% of base per full week, capped at +100%
pub fn xp_per_day(category: StreakCategory, current: u32) -> u32 {
    let base = category.base_xp();
    let bonuses = (current / 7).min(MAX_WEEKLY_BONUSES);
    base + base * bonuses / 4
}

/// Build a streak for one category from its active days
pub fn build_streak(
    category: StreakCategory,
    days: &BTreeSet<NaiveDate>,
    today: NaiveDate,
) -> Streak {
    let current_days = compute_streak(days, today);
    let personal_best = personal_best_streak(days).max(current_days);
    let milestone = next_milestone(current_days);

    Streak {
        name: category.display_name().to_string(),
        category,
        current_days,
        personal_best,
        days_to_next_milestone: milestone - current_days,
        is_endangered: current_days > 0 && !days.contains(&today),
        xp_per_day: xp_per_day(category, current_days),
        milestone_xp: milestone * MILESTONE_XP_PER_DAY,
    }
}
