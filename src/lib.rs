//! LifeOS Dimensions - On-device scoring engine for life-tracking dashboards
//!
//! Dimensions turn a local store of timestamped records ("atoms") into display
//! snapshots through a deterministic pipeline: metric extraction → temporal
//! aggregation → composite scoring → snapshot assembly → publishing.
//!
//! ## Modules
//!
//! - **Behavioral**: deep work, movement, sleep, tasks and routines into the
//!   Discipline Index
//! - **Reflection**: journaling, mood, meditation and insights into the
//!   Reflection Index, with recurring themes and a mood timeline

pub mod behavior;
pub mod composite;
pub mod config;
pub mod error;
pub mod metadata;
pub mod narrative;
pub mod pipeline;
pub mod publish;
pub mod reflection;
pub mod store;
pub mod streak;
pub mod temporal;
pub mod types;

pub use config::DimensionConfig;
pub use error::{DimensionError, MetadataError, StoreError};
pub use pipeline::{refresh, snapshot_to_json, DimensionProcessor, DimensionProvider};
pub use publish::{Published, SnapshotCell};
pub use store::{AtomSnapshot, AtomStore, InMemoryAtomStore, NewAtom};
pub use types::{Atom, AtomType, DimensionIndex, MetricReading, Streak};

// Dimension exports
pub use behavior::{BehavioralProvider, BehavioralSnapshot};
pub use reflection::{ReflectionProvider, ReflectionSnapshot};

/// Crate version reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "lifeos-dimensions";
