//! Theme extraction from journal text
//!
//! Journal bodies are split into lowercase alphabetic tokens, reduced to a
//! lemma by a small suffix-stripping lemmatizer, filtered against a stop-word
//! list, and counted. Lemmas mentioned often enough become themes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::config::ThemeConfig;
use crate::store::fingerprint;
use crate::temporal::{atom_day, DayWindow};
use crate::types::{Atom, ReflectionTheme};

/// Lemmas never reported as themes
const STOP_WORDS: &[&str] = &[
    "about", "above", "actually", "after", "again", "against", "almost", "also", "although",
    "always", "another", "anything", "around", "away", "back", "be", "because", "been", "before",
    "being", "below", "between", "both", "come", "could", "day", "didn", "does", "doesn", "doing",
    "done", "down", "during", "each", "else", "even", "ever", "every", "everything", "feel",
    "felt", "few", "first", "from", "further", "get", "give", "go", "going", "good", "have",
    "having", "here", "herself", "himself", "into", "itself", "just", "keep", "know", "last",
    "later", "less", "like", "little", "long", "look", "made", "make", "many", "maybe", "might",
    "more", "most", "much", "must", "myself", "need", "never", "next", "nothing", "once", "only",
    "other", "ourselves", "over", "pretty", "quite", "rather", "really", "right", "said", "same",
    "seem", "should", "since", "some", "something", "sometimes", "still", "such", "sure",
    "take", "than", "that", "their", "theirs", "them", "themselves", "then", "there", "these",
    "they", "thing", "think", "this", "those", "though", "thought", "through", "today",
    "together", "tomorrow", "tonight", "too", "toward", "under", "until", "upon", "very",
    "want", "wasn", "week", "well", "went", "were", "what", "whatever", "when", "where",
    "whether", "which", "while", "whole", "will", "with", "within", "without", "would",
    "yesterday", "your", "yours", "yourself",
];

/// Irregular forms mapped straight to their lemma
const IRREGULAR: &[(&str, &str)] = &[
    ("children", "child"),
    ("feet", "foot"),
    ("felt", "feel"),
    ("lives", "life"),
    ("men", "man"),
    ("people", "person"),
    ("thought", "think"),
    ("went", "go"),
    ("women", "woman"),
    ("wrote", "write"),
];

/// Split text into lowercase alphabetic tokens
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphabetic())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

/// Reduce a lowercase token to its lemma
pub fn lemmatize(token: &str) -> String {
    if let Some((_, lemma)) = IRREGULAR.iter().find(|(form, _)| *form == token) {
        return (*lemma).to_string();
    }

    if let Some(stem) = token.strip_suffix("ies").filter(|s| s.len() >= 2) {
        return format!("{stem}y");
    }
    if let Some(stem) = token.strip_suffix("ied").filter(|s| s.len() >= 2) {
        return format!("{stem}y");
    }
    if let Some(stem) = token.strip_suffix("ing").filter(|s| s.len() >= 3) {
        return restore_stem(stem);
    }
    if let Some(stem) = token.strip_suffix("ed").filter(|s| s.len() >= 3) {
        return restore_stem(stem);
    }
    if let Some(stem) = token.strip_suffix("es") {
        if ["s", "x", "z", "ch", "sh"].iter().any(|end| stem.ends_with(end)) && stem.len() >= 3 {
            return stem.to_string();
        }
    }
    if token.ends_with('s') && !["ss", "us", "is"].iter().any(|end| token.ends_with(end)) {
        return token[..token.len() - 1].to_string();
    }
    token.to_string()
}

/// Undo consonant doubling (`runn` → `run`) and restore a dropped `e` on short
/// consonant-vowel-consonant stems (`hop` → `hope`)
fn restore_stem(stem: &str) -> String {
    let chars: Vec<char> = stem.chars().collect();
    let n = chars.len();

    let last = chars[n - 1];
    if n >= 2 && last == chars[n - 2] && !is_vowel(last) && !matches!(last, 'l' | 's' | 'z') {
        return chars[..n - 1].iter().collect();
    }
    if n == 3
        && !is_vowel(chars[0])
        && is_vowel(chars[1])
        && !is_vowel(last)
        && !matches!(last, 'w' | 'x' | 'y')
    {
        return format!("{stem}e");
    }
    stem.to_string()
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn is_stop_word(lemma: &str) -> bool {
    STOP_WORDS.contains(&lemma)
}

#[derive(Default)]
struct Tally {
    mentions: u32,
    weekly: u32,
    last: Option<DateTime<Utc>>,
}

/// Extract themes from journal entries.
///
/// Entries dated after `window.today` are ignored. `weekly_change` counts
/// mentions in entries whose local day falls inside `window`.
pub fn extract_themes(
    journals: &[Atom],
    window: &DayWindow,
    config: &ThemeConfig,
) -> Vec<ReflectionTheme> {
    let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();

    for entry in journals {
        let Some(body) = entry.body.as_deref() else {
            continue;
        };
        let day = atom_day(entry, &window.offset);
        if day.map_or(false, |d| d > window.today) {
            continue;
        }
        let recent = day.map_or(false, |d| window.contains(d));
        let created = entry.created_at_utc();

        for token in tokenize(body).filter(|t| t.chars().count() > config.min_token_len) {
            let lemma = lemmatize(&token);
            if is_stop_word(&token) || is_stop_word(&lemma) {
                continue;
            }
            let tally = tallies.entry(lemma).or_default();
            tally.mentions += 1;
            if recent {
                tally.weekly += 1;
            }
            tally.last = tally.last.max(created);
        }
    }

    let mut themes: Vec<ReflectionTheme> = tallies
        .into_iter()
        .filter(|(_, tally)| tally.mentions >= config.min_mentions)
        .map(|(name, tally)| ReflectionTheme {
            name,
            mention_count: tally.mentions,
            weekly_change: tally.weekly,
            last_mentioned: tally.last,
        })
        .collect();

    // BTreeMap iteration is name-ordered, so a stable sort keeps ties by name
    themes.sort_by(|a, b| b.mention_count.cmp(&a.mention_count));
    themes.truncate(config.max_themes);
    themes
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ThemeKey {
    fingerprint: String,
    window: DayWindow,
}

/// Memoizes theme extraction.
///
/// Keyed by a content fingerprint of the journal entries plus the day window,
/// so an edited entry invalidates the cache even when the entry count is
/// unchanged, and a new local day recomputes `weekly_change`.
#[derive(Debug, Default)]
pub struct ThemeCache {
    entry: Mutex<Option<(ThemeKey, Vec<ReflectionTheme>)>>,
}

impl ThemeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached themes for these entries, extracting them on a miss
    pub fn themes(
        &self,
        journals: &[Atom],
        window: &DayWindow,
        config: &ThemeConfig,
    ) -> Vec<ReflectionTheme> {
        let key = ThemeKey {
            fingerprint: fingerprint(journals),
            window: *window,
        };

        let mut entry = self.entry.lock();
        if let Some((cached_key, themes)) = entry.as_ref() {
            if *cached_key == key {
                tracing::debug!(themes = themes.len(), "theme cache hit");
                return themes.clone();
            }
        }

        let themes = extract_themes(journals, window, config);
        *entry = Some((key, themes.clone()));
        themes
    }

    /// Drop the cached result
    pub fn clear(&self) {
        *self.entry.lock() = None;
    }
}
