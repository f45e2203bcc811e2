//! Reflection dimension
//!
//! Scores journaling, writing depth, emotional awareness, meditation and
//! grail insights into the Reflection Index, and assembles the themes and
//! mood timeline shown alongside it.
//!
//! Pipeline: AtomSnapshot → metrics / themes / mood → composite → ReflectionSnapshot

pub mod metrics;
pub mod mood;
pub mod provider;
pub mod themes;

pub use provider::{ReflectionProvider, ReflectionSnapshot, REFLECTION_TYPES};
pub use themes::{extract_themes, lemmatize, ThemeCache};
