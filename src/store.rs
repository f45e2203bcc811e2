//! Atom store contract and an in-memory implementation
//!
//! The real store is an external collaborator. Dimensions only need
//! `fetch_all(type)` and `create(...)`; reads are best-effort and a failed read
//! is treated as "no data" for the affected metrics.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{DimensionError, StoreError};
use crate::types::{Atom, AtomType};

/// Fields for a new atom
#[derive(Debug, Clone)]
pub struct NewAtom {
    pub atom_type: AtomType,
    pub title: String,
    pub body: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl NewAtom {
    pub fn new(atom_type: AtomType, title: impl Into<String>) -> Self {
        Self {
            atom_type,
            title: title.into(),
            body: None,
            metadata: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Typed-record store consumed by the dimension providers
pub trait AtomStore {
    /// Fetch every non-deleted atom of a type
    fn fetch_all(&self, atom_type: AtomType) -> Result<Vec<Atom>, StoreError>;

    /// Create a new atom stamped with the current time
    fn create(&self, new_atom: NewAtom) -> Result<Atom, StoreError>;

    /// Monotonic version that changes whenever the stored set changes, if the
    /// store tracks one
    fn version(&self) -> Option<u64> {
        None
    }
}

/// In-memory atom store with a monotonic version counter
#[derive(Debug, Default)]
pub struct InMemoryAtomStore {
    atoms: RwLock<Vec<Atom>>,
    version: AtomicU64,
}

impl InMemoryAtomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing atoms
    pub fn from_atoms(atoms: Vec<Atom>) -> Self {
        Self {
            atoms: RwLock::new(atoms),
            version: AtomicU64::new(1),
        }
    }

    /// Load a store from a JSON array of atoms
    pub fn from_json(json: &str) -> Result<Self, DimensionError> {
        Ok(Self::from_atoms(parse_atoms_json(json)?))
    }

    /// Load a store from newline-delimited JSON (one atom per line)
    pub fn from_ndjson(ndjson: &str) -> Result<Self, DimensionError> {
        Ok(Self::from_atoms(parse_atoms_ndjson(ndjson)?))
    }

    /// Load a store from a file; `.ndjson`/`.jsonl` files are read line by line
    pub fn load(path: &Path) -> Result<Self, DimensionError> {
        let data = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("ndjson") | Some("jsonl") => Self::from_ndjson(&data),
            _ => Self::from_json(&data),
        }
    }

    /// Serialize every atom (including soft-deleted ones) to a JSON array
    pub fn to_json(&self) -> Result<String, DimensionError> {
        Ok(serde_json::to_string_pretty(&*self.atoms.read())?)
    }

    /// Create an atom with an explicit creation time
    pub fn create_at(&self, new_atom: NewAtom, created_at: DateTime<Utc>) -> Atom {
        let atom = Atom {
            id: Uuid::new_v4().to_string(),
            atom_type: new_atom.atom_type,
            title: new_atom.title,
            body: new_atom.body,
            metadata: new_atom.metadata,
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            is_deleted: false,
        };
        self.atoms.write().push(atom.clone());
        self.version.fetch_add(1, Ordering::SeqCst);
        atom
    }

    /// Flag an atom as deleted
    pub fn soft_delete(&self, id: &str) -> Result<(), StoreError> {
        let mut atoms = self.atoms.write();
        let atom = atoms
            .iter_mut()
            .find(|a| a.id == id && !a.is_deleted)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        atom.is_deleted = true;
        self.version.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Number of non-deleted atoms
    pub fn len(&self) -> usize {
        self.atoms.read().iter().filter(|a| !a.is_deleted).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AtomStore for InMemoryAtomStore {
    fn fetch_all(&self, atom_type: AtomType) -> Result<Vec<Atom>, StoreError> {
        Ok(self
            .atoms
            .read()
            .iter()
            .filter(|a| a.atom_type == atom_type && !a.is_deleted)
            .cloned()
            .collect())
    }

    fn create(&self, new_atom: NewAtom) -> Result<Atom, StoreError> {
        Ok(self.create_at(new_atom, Utc::now()))
    }

    fn version(&self) -> Option<u64> {
        Some(self.version.load(Ordering::SeqCst))
    }
}

/// Parse a JSON array of atoms
pub fn parse_atoms_json(json: &str) -> Result<Vec<Atom>, DimensionError> {
    serde_json::from_str::<Vec<Atom>>(json).map_err(|e| {
        DimensionError::from(StoreError::ParseError(format!(
            "Failed to parse atom array: {}",
            e
        )))
    })
}

/// Parse newline-delimited atoms, skipping blank lines
pub fn parse_atoms_ndjson(ndjson: &str) -> Result<Vec<Atom>, DimensionError> {
    ndjson
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str::<Atom>(line.trim()).map_err(|e| {
                DimensionError::from(StoreError::ParseError(format!("line {}: {}", index + 1, e)))
            })
        })
        .collect()
}

/// Read one atom type, treating a failed read as an empty result
pub fn fetch_best_effort<S: AtomStore + ?Sized>(store: &S, atom_type: AtomType) -> Vec<Atom> {
    match store.fetch_all(atom_type) {
        Ok(atoms) => atoms,
        Err(err) => {
            tracing::warn!(?atom_type, error = %err, "atom fetch failed, treating as no data");
            Vec::new()
        }
    }
}

/// Consistent set of atoms read once before a derivation
#[derive(Debug, Clone, Default)]
pub struct AtomSnapshot {
    atoms: BTreeMap<AtomType, Vec<Atom>>,
    version: Option<u64>,
}

impl AtomSnapshot {
    /// Read every requested type from the store (best-effort)
    pub fn capture<S: AtomStore + ?Sized>(store: &S, types: &[AtomType]) -> Self {
        let version = store.version();
        let atoms = types
            .iter()
            .map(|&atom_type| (atom_type, fetch_best_effort(store, atom_type)))
            .collect();
        Self { atoms, version }
    }

    /// Build a snapshot directly from atoms; deleted atoms are dropped
    pub fn from_atoms(atoms: impl IntoIterator<Item = Atom>) -> Self {
        let mut grouped: BTreeMap<AtomType, Vec<Atom>> = BTreeMap::new();
        for atom in atoms.into_iter().filter(|a| !a.is_deleted) {
            grouped.entry(atom.atom_type).or_default().push(atom);
        }
        Self {
            atoms: grouped,
            version: None,
        }
    }

    /// Atoms of one type (empty when not captured or the read failed)
    pub fn of(&self, atom_type: AtomType) -> &[Atom] {
        self.atoms.get(&atom_type).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Store version at capture time, if the store tracks one
    pub fn version(&self) -> Option<u64> {
        self.version
    }

    /// Total number of atoms in the snapshot
    pub fn len(&self) -> usize {
        self.atoms.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Newest parseable creation time across the given types
    pub fn newest(&self, types: &[AtomType]) -> Option<DateTime<Utc>> {
        types
            .iter()
            .flat_map(|&t| self.of(t))
            .filter_map(Atom::created_at_utc)
            .max()
    }
}

/// SHA-256 fingerprint over ids, timestamps and bodies of a set of atoms.
///
/// Order-independent: atoms are sorted by id before hashing.
pub fn fingerprint(atoms: &[Atom]) -> String {
    let mut sorted: Vec<&Atom> = atoms.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut hasher = Sha256::new();
    for atom in sorted {
        hasher.update(atom.id.as_bytes());
        hasher.update([0u8]);
        hasher.update(atom.created_at.as_bytes());
        hasher.update([0u8]);
        hasher.update(atom.body.as_deref().unwrap_or_default().as_bytes());
        hasher.update([0xffu8]);
    }
    format!("{:x}", hasher.finalize())
}
