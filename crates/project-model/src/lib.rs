//! RallyMark Project Model
//!
//! Defines the core data contracts for RallyMark match projects:
//! - **Markers:** Timestamped match events (serve, point outcomes) and the
//!   ordered store that owns them
//! - **Clips:** Derived serve-to-outcome ranges and running scores
//! - **Project:** Top-level metadata, source media, and team labels
//!
//! All timestamps are integer milliseconds from the start of the source media.

pub mod clip;
pub mod marker;
pub mod project;

pub use clip::*;
pub use marker::*;
pub use project::*;
