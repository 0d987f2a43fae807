//! Media-processing collaborator.
//!
//! Segment operations build a description of the output (which source
//! interval, which layers on top); nothing is decoded until [`MediaProcessor::write`]
//! executes the whole stream. That keeps the pipeline testable with a fake
//! processor and lets the ffmpeg backend turn each segment into one
//! filter graph.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rallymark_common::config::ExportDefaults;
use rallymark_project_model::marker::TimestampMs;

use crate::export::{ExportError, ExportProgress};

/// Where a layer is anchored on the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPosition {
    /// Horizontally centred, `margin` pixels below the top edge.
    TopCenter { margin: u32 },
}

/// Text burned into a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLayer {
    pub text: String,
    pub font_size: u32,
    pub position: OverlayPosition,
    /// How long the text stays visible from the segment start.
    pub duration_ms: TimestampMs,
}

/// Image composited onto a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLayer {
    pub path: PathBuf,
    pub position: OverlayPosition,
    pub duration_ms: TimestampMs,
}

/// One source interval plus the layers drawn over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub source: PathBuf,
    pub start_ms: TimestampMs,
    pub end_ms: TimestampMs,
    /// Drawn in order, after all images.
    pub texts: Vec<TextLayer>,
    pub images: Vec<ImageLayer>,
}

impl Segment {
    pub fn duration_ms(&self) -> TimestampMs {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// Segments played back to back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stream {
    pub segments: Vec<Segment>,
}

impl Stream {
    pub fn duration_ms(&self) -> TimestampMs {
        self.segments.iter().map(Segment::duration_ms).sum()
    }
}

/// Encoder settings for the final artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingOptions {
    pub fps: u32,
    pub video_codec: String,
    pub preset: String,
    pub crf: u32,
    pub audio_bitrate_kbps: u32,
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self::from(&ExportDefaults::default())
    }
}

impl From<&ExportDefaults> for EncodingOptions {
    fn from(defaults: &ExportDefaults) -> Self {
        Self {
            fps: defaults.fps,
            video_codec: defaults.video_codec.clone(),
            preset: defaults.preset.clone(),
            crf: defaults.crf,
            audio_bitrate_kbps: defaults.audio_bitrate_kbps,
        }
    }
}

/// Cancellation and progress plumbing handed to [`MediaProcessor::write`].
pub struct WriteControl<'a> {
    cancel: &'a AtomicBool,
    progress: &'a dyn Fn(ExportProgress),
}

impl<'a> WriteControl<'a> {
    pub fn new(cancel: &'a AtomicBool, progress: &'a dyn Fn(ExportProgress)) -> Self {
        Self { cancel, progress }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn report(&self, progress: ExportProgress) {
        (self.progress)(progress);
    }
}

/// Trait for media-processing backends.
pub trait MediaProcessor: Send {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Confirm the source can be read. Fails with
    /// [`ExportError::SourceUnreadable`].
    fn open_source(&mut self, source: &Path) -> Result<(), ExportError>;

    fn extract_segment(
        &mut self,
        source: &Path,
        start_ms: TimestampMs,
        end_ms: TimestampMs,
    ) -> Result<Segment, ExportError> {
        if end_ms < start_ms {
            return Err(ExportError::Media(format!(
                "Reversed segment {start_ms}..{end_ms}ms"
            )));
        }
        Ok(Segment {
            source: source.to_path_buf(),
            start_ms,
            end_ms,
            texts: Vec::new(),
            images: Vec::new(),
        })
    }

    fn overlay_text(&mut self, mut segment: Segment, layer: TextLayer) -> Result<Segment, ExportError> {
        segment.texts.push(layer);
        Ok(segment)
    }

    fn overlay_image(
        &mut self,
        mut segment: Segment,
        layer: ImageLayer,
    ) -> Result<Segment, ExportError> {
        segment.images.push(layer);
        Ok(segment)
    }

    fn concatenate(&mut self, segments: Vec<Segment>) -> Result<Stream, ExportError> {
        Ok(Stream { segments })
    }

    /// Encode `stream` into `output`. Implementations must poll
    /// `control.is_cancelled()` and stop with [`ExportError::Cancelled`].
    fn write(
        &mut self,
        stream: &Stream,
        output: &Path,
        encoding: &EncodingOptions,
        control: &WriteControl<'_>,
    ) -> Result<(), ExportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Describe;

    impl MediaProcessor for Describe {
        fn name(&self) -> &str {
            "describe"
        }

        fn open_source(&mut self, _source: &Path) -> Result<(), ExportError> {
            Ok(())
        }

        fn write(
            &mut self,
            _stream: &Stream,
            _output: &Path,
            _encoding: &EncodingOptions,
            _control: &WriteControl<'_>,
        ) -> Result<(), ExportError> {
            Ok(())
        }
    }

    #[test]
    fn test_default_segment_operations_build_description() {
        let mut processor = Describe;
        let source = Path::new("match.mp4");
        let segment = processor.extract_segment(source, 1_000, 4_000).unwrap();
        let segment = processor
            .overlay_text(
                segment,
                TextLayer {
                    text: "Home 1 - 0 Away".to_string(),
                    font_size: 48,
                    position: OverlayPosition::TopCenter { margin: 24 },
                    duration_ms: 3_000,
                },
            )
            .unwrap();
        let stream = processor.concatenate(vec![segment.clone(), segment]).unwrap();

        assert_eq!(stream.segments.len(), 2);
        assert_eq!(stream.segments[0].texts[0].text, "Home 1 - 0 Away");
        assert_eq!(stream.duration_ms(), 6_000);
    }

    #[test]
    fn test_extract_allows_zero_length_but_not_reversed() {
        let segment = Describe
            .extract_segment(Path::new("match.mp4"), 5_000, 5_000)
            .unwrap();
        assert_eq!(segment.duration_ms(), 0);

        let err = Describe
            .extract_segment(Path::new("match.mp4"), 5_000, 4_999)
            .unwrap_err();
        assert!(matches!(err, ExportError::Media(_)));
    }

    #[test]
    fn test_encoding_from_config_defaults() {
        let encoding = EncodingOptions::default();
        assert_eq!(encoding.fps, 30);
        assert_eq!(encoding.video_codec, "libx264");
    }
}
