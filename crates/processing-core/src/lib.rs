//! RallyMark Processing Core
//!
//! Turns a flat marker stream into editing decisions:
//! - **Clip Planner:** Pair each serve with the marker that closes it
//! - **Score Tracker:** Running home/away score at any instant or clip
//!
//! This crate is pure computation with no I/O.
//! All inputs are data; all outputs are data.

pub mod planner;
pub mod score;

pub use planner::{plan, PlanError};
pub use score::{running_scores, score_at, score_for_clip};
