//! RallyMark Common Utilities
//!
//! Shared infrastructure for all RallyMark crates:
//! - Error types and result aliases
//! - Millisecond clock and timestamp parsing/formatting
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
