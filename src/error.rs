//! Error types for LifeOS dimensions
//!
//! Derivation itself never fails: degraded inputs fall back to defaults. These
//! errors surface only at the edges (configuration, store I/O, JSON parsing).

use thiserror::Error;

use crate::types::AtomType;

/// Errors that can occur at the crate boundary
#[derive(Debug, Error)]
pub enum DimensionError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid UTC offset: {0} minutes")]
    InvalidTimezone(i32),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),
}

/// Errors reported by an atom store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Atom not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to parse stored atoms: {0}")]
    ParseError(String),
}

/// Errors raised while parsing the typed metadata of a single atom
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Metadata for {atom_type:?} is not a JSON object")]
    NotAnObject { atom_type: AtomType },

    #[error("Malformed metadata for {atom_type:?}: {source}")]
    Malformed {
        atom_type: AtomType,
        #[source]
        source: serde_json::Error,
    },
}
