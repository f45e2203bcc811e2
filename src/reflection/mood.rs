//! Mood timeline
//!
//! Builds the emotional timeline from mood check-ins and journal entries and
//! buckets it per local day.

use chrono::{DateTime, Duration, Utc};

use crate::metadata;
use crate::reflection::themes::tokenize;
use crate::temporal::{local_day, DayWindow};
use crate::types::{Atom, EmotionalDataPoint, MoodBucket, MoodSource};

const POSITIVE_WORDS: &[&str] = &[
    "calm", "confident", "content", "energized", "excited", "glad", "grateful", "great",
    "happy", "hopeful", "inspired", "joy", "joyful", "love", "loved", "motivated", "peaceful",
    "proud", "relaxed", "rested", "thankful", "wonderful",
];

const NEGATIVE_WORDS: &[&str] = &[
    "afraid", "angry", "annoyed", "anxious", "awful", "bored", "depressed", "drained",
    "exhausted", "frustrated", "guilty", "hurt", "lonely", "nervous", "overwhelmed", "sad",
    "stressed", "tired", "upset", "worried",
];

/// Valence inferred from sentiment words: (positive - negative) / (positive +
/// negative). `None` when the text carries no sentiment words.
pub fn infer_valence(text: &str) -> Option<f64> {
    let (positive, negative) = tokenize(text).fold((0u32, 0u32), |(pos, neg), token| {
        if POSITIVE_WORDS.contains(&token.as_str()) {
            (pos + 1, neg)
        } else if NEGATIVE_WORDS.contains(&token.as_str()) {
            (pos, neg + 1)
        } else {
            (pos, neg)
        }
    });

    let total = positive + negative;
    (total > 0).then(|| (f64::from(positive) - f64::from(negative)) / f64::from(total))
}

/// Emotional timeline up to `now`, sorted by timestamp.
///
/// Check-ins give manual points. Journals with explicit valence or energy give
/// journal points; other journals with sentiment words give inferred points
/// with neutral energy.
pub fn mood_timeline(
    checkins: &[Atom],
    journals: &[Atom],
    now: DateTime<Utc>,
) -> Vec<EmotionalDataPoint> {
    let manual = checkins.iter().filter_map(|atom| {
        let (valence, energy) = metadata::mood(atom)?;
        Some((atom, valence, energy, MoodSource::Manual))
    });

    let written = journals.iter().filter_map(|atom| {
        if let Some((valence, energy)) = metadata::mood(atom) {
            return Some((atom, valence, energy, MoodSource::Journal));
        }
        let valence = infer_valence(atom.body.as_deref()?)?;
        Some((atom, valence, 0.0, MoodSource::Inferred))
    });

    let mut timeline: Vec<EmotionalDataPoint> = manual
        .chain(written)
        .filter_map(|(atom, valence, energy, source)| {
            let timestamp = atom.created_at_utc().filter(|ts| *ts <= now)?;
            Some(EmotionalDataPoint {
                timestamp,
                valence,
                energy,
                source,
            })
        })
        .collect();

    timeline.sort_by_key(|point| point.timestamp);
    timeline
}

/// One bucket per day of `window`, oldest first. Days without points have no
/// valence or energy and zero samples.
pub fn mood_buckets(timeline: &[EmotionalDataPoint], window: &DayWindow) -> Vec<MoodBucket> {
    let mut buckets = Vec::with_capacity(window.days as usize);
    let mut date = window.start();

    while date <= window.today {
        let points: Vec<&EmotionalDataPoint> = timeline
            .iter()
            .filter(|p| local_day(p.timestamp, &window.offset) == date)
            .collect();
        let samples = points.len() as u32;
        let mean = |value: fn(&EmotionalDataPoint) -> f64| {
            (samples > 0).then(|| points.iter().map(|p| value(p)).sum::<f64>() / f64::from(samples))
        };

        buckets.push(MoodBucket {
            date,
            valence: mean(|p| p.valence),
            energy: mean(|p| p.energy),
            samples,
        });
        date += Duration::days(1);
    }
    buckets
}
