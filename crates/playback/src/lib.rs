//! RallyMark Playback
//!
//! Everything between the operator and the marker store while tagging:
//! - **Backend:** The media-playback contract and a headless playhead
//! - **Duration:** One-shot duration probing with an async readiness signal
//! - **Session:** Command/query surface over a shared marker store
//! - **Timeline:** Mapping between playback time and a drawn strip

pub mod backend;
pub mod duration;
pub mod session;
pub mod timeline;

pub use backend::{HeadlessPlayer, PlaybackBackend};
pub use duration::{DurationSource, DurationWatch, FfprobeDuration};
pub use session::TaggingSession;
