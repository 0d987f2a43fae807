//! RallyMark Render Engine
//!
//! Offline pipeline that turns planned clips into a single highlight video
//! with a running score burned into every clip.
//!
//! # Pipeline Architecture
//!
//! ```text
//! markers.json ── plan ── clips ──┐
//!                                 ├── compose_overlays (running score)
//! OverlaySpec ────────────────────┘         │
//!                                           ├── extract_segment (source window)
//! match.mp4 ────────────────────────────────┘         │
//!                                                     ├── overlay_image / overlay_text
//!                                                     ▼
//!                                               concatenate
//!                                                     │
//!                                                     ▼
//!                                       write (.output.partial.mp4)
//!                                                     │
//!                                                     ▼
//!                                                output.mp4
//! ```

pub mod compositor;
pub mod export;
pub mod ffmpeg;
pub mod media;
pub mod publish;

pub use compositor::{compose_overlays, ClipComposition, OverlaySpec};
pub use export::*;
pub use ffmpeg::FfmpegProcessor;
pub use media::{EncodingOptions, MediaProcessor, Segment, Stream, WriteControl};
pub use publish::{PublishError, UploadMetadata};
