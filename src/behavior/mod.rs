//! Behavioral (discipline) dimension
//!
//! Scores deep work, movement, sleep, task completion and morning routines
//! into the Discipline Index, with streaks and predictions.
//!
//! Pipeline: AtomSnapshot → metrics → composite → streaks → BehavioralSnapshot

pub mod metrics;
pub mod provider;

pub use provider::{BehavioralProvider, BehavioralSnapshot, BEHAVIORAL_TYPES};
