//! Pipeline orchestration
//!
//! This module provides the public refresh API for dimension providers.
//!
//! Pipeline: AtomStore → AtomSnapshot → DimensionProvider::derive → SnapshotCell
//!
//! Derivation is a pure function of the captured atoms and an explicit `now`.
//! The store is read once per refresh, before any derivation starts.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::DimensionError;
use crate::publish::{Published, SnapshotCell};
use crate::store::{AtomSnapshot, AtomStore};
use crate::types::AtomType;

/// A dimension that derives a display snapshot from atoms
pub trait DimensionProvider {
    /// Immutable view model produced by one refresh
    type Snapshot;

    /// Dimension name used in logs and CLI output
    fn name(&self) -> &'static str;

    /// Atom types read from the store before derivation
    fn required_types(&self) -> &'static [AtomType];

    /// Derive the snapshot. Never fails: missing or malformed data degrades
    /// into unavailable readings.
    fn derive(&self, atoms: &AtomSnapshot, now: DateTime<Utc>) -> Self::Snapshot;
}

/// Run one refresh: capture the required atoms and derive a snapshot.
///
/// # Example
/// ```ignore
/// let provider = BehavioralProvider::new(&DimensionConfig::default())?;
/// let snapshot = refresh(&provider, &store, Utc::now());
/// ```
pub fn refresh<P, S>(provider: &P, store: &S, now: DateTime<Utc>) -> P::Snapshot
where
    P: DimensionProvider + ?Sized,
    S: AtomStore + ?Sized,
{
    let started = Instant::now();
    let atoms = AtomSnapshot::capture(store, provider.required_types());
    let snapshot = provider.derive(&atoms, now);

    tracing::debug!(
        dimension = provider.name(),
        atoms = atoms.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "dimension refreshed"
    );
    snapshot
}

/// Stateful processor that keeps the latest snapshot published.
///
/// Use this when readers on other threads need the most recent result. Each
/// refresh replaces the published snapshot; a late refresh overwrites an
/// earlier one.
pub struct DimensionProcessor<P: DimensionProvider> {
    provider: P,
    cell: SnapshotCell<P::Snapshot>,
}

impl<P: DimensionProvider> DimensionProcessor<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            cell: SnapshotCell::new(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Refresh from the store and publish, returning the publish sequence
    pub fn refresh<S: AtomStore + ?Sized>(&self, store: &S, now: DateTime<Utc>) -> u64 {
        let snapshot = refresh(&self.provider, store, now);
        let sequence = self.cell.publish(snapshot);
        tracing::debug!(dimension = self.provider.name(), sequence, "snapshot published");
        sequence
    }

    /// Latest published snapshot, if any refresh has completed
    pub fn latest(&self) -> Option<Arc<Published<P::Snapshot>>> {
        self.cell.latest()
    }

    /// Sequence of the latest snapshot (0 before the first refresh)
    pub fn sequence(&self) -> u64 {
        self.cell.sequence()
    }
}

impl<P> DimensionProcessor<P>
where
    P: DimensionProvider,
    P::Snapshot: Serialize,
{
    /// Latest snapshot as pretty JSON
    pub fn latest_json(&self) -> Result<Option<String>, DimensionError> {
        self.latest()
            .map(|published| snapshot_to_json(&published.value))
            .transpose()
    }
}

/// Serialize a snapshot to pretty JSON
pub fn snapshot_to_json<T: Serialize>(snapshot: &T) -> Result<String, DimensionError> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::{InMemoryAtomStore, NewAtom};
    use crate::types::Atom;
    use chrono::TimeZone;

    /// Counts journal entries and tasks created before `now`
    struct CountingProvider;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Counts {
        journals: usize,
        tasks: usize,
    }

    impl DimensionProvider for CountingProvider {
        type Snapshot = Counts;

        fn name(&self) -> &'static str {
            "counting"
        }

        fn required_types(&self) -> &'static [AtomType] {
            &[AtomType::JournalEntry, AtomType::Task]
        }

        fn derive(&self, atoms: &AtomSnapshot, now: DateTime<Utc>) -> Counts {
            let before_now = |list: &[Atom]| {
                list.iter()
                    .filter(|a| a.created_at_utc().map_or(false, |ts| ts <= now))
                    .count()
            };
            Counts {
                journals: before_now(atoms.of(AtomType::JournalEntry)),
                tasks: before_now(atoms.of(AtomType::Task)),
            }
        }
    }

    struct BrokenStore;

    impl AtomStore for BrokenStore {
        fn fetch_all(&self, _atom_type: AtomType) -> Result<Vec<Atom>, StoreError> {
            Err(StoreError::Unavailable("locked".to_string()))
        }

        fn create(&self, _new_atom: NewAtom) -> Result<Atom, StoreError> {
            Err(StoreError::Unavailable("locked".to_string()))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn store() -> InMemoryAtomStore {
        let store = InMemoryAtomStore::new();
        let earlier = now() - chrono::Duration::hours(2);
        store.create_at(NewAtom::new(AtomType::JournalEntry, "a"), earlier);
        store.create_at(NewAtom::new(AtomType::JournalEntry, "b"), earlier);
        store.create_at(NewAtom::new(AtomType::Task, "c"), earlier);
        store.create_at(NewAtom::new(AtomType::Idea, "ignored"), earlier);
        store
    }

    #[test]
    fn test_refresh_reads_required_types() {
        let counts = refresh(&CountingProvider, &store(), now());
        assert_eq!(counts, Counts { journals: 2, tasks: 1 });
    }

    #[test]
    fn test_refresh_uses_explicit_now() {
        let before = now() - chrono::Duration::days(1);
        let counts = refresh(&CountingProvider, &store(), before);
        assert_eq!(counts, Counts { journals: 0, tasks: 0 });
    }

    #[test]
    fn test_broken_store_degrades_to_empty() {
        let counts = refresh(&CountingProvider, &BrokenStore, now());
        assert_eq!(counts, Counts { journals: 0, tasks: 0 });
    }

    #[test]
    fn test_processor_publishes_each_refresh() {
        let processor = DimensionProcessor::new(CountingProvider);
        assert!(processor.latest().is_none());
        assert_eq!(processor.latest_json().unwrap(), None);

        let store = store();
        assert_eq!(processor.refresh(&store, now()), 1);
        store.create_at(NewAtom::new(AtomType::Task, "d"), now());
        assert_eq!(processor.refresh(&store, now()), 2);

        let latest = processor.latest().unwrap();
        assert_eq!(latest.sequence, 2);
        assert_eq!(latest.value.tasks, 2);

        let json: serde_json::Value =
            serde_json::from_str(&processor.latest_json().unwrap().unwrap()).unwrap();
        assert_eq!(json["journals"], 2);
    }
}
