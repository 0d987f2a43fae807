//! Export pipeline: planned clips in, one score-annotated video out.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rallymark_common::config::AppConfig;
use rallymark_common::error::RallymarkError;
use rallymark_processing_core::{plan, PlanError};
use rallymark_project_model::clip::{ClipRange, ScoreState};
use rallymark_project_model::marker::Marker;
use rallymark_project_model::project::LoadedMatch;

use crate::compositor::{compose_overlays, OverlaySpec};
use crate::media::{EncodingOptions, MediaProcessor, WriteControl};

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Export progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportProgress {
    /// Clips fully encoded so far.
    pub clips_rendered: usize,

    pub total_clips: usize,

    /// Overall progress [0.0, 1.0].
    pub progress: f64,

    pub stage: ExportStage,
}

impl ExportProgress {
    pub fn new(stage: ExportStage, clips_rendered: usize, total_clips: usize, progress: f64) -> Self {
        Self {
            clips_rendered,
            total_clips,
            progress: progress.clamp(0.0, 1.0),
            stage,
        }
    }
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Rendering,
    Concatenating,
    Finalizing,
    Complete,
    Failed,
}

/// Errors that can occur while exporting.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Nothing to export: no complete rallies")]
    NoClips,

    #[error("Cannot read source media {path}: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("Media processing failed: {0}")]
    Media(String),

    #[error("Export cancelled")]
    Cancelled,

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<ExportError> for RallymarkError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Plan(err) => err.into(),
            other => RallymarkError::export(other.to_string()),
        }
    }
}

/// An export job ready to be rendered.
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Recorded match video.
    pub source: PathBuf,

    /// Output file path.
    pub output: PathBuf,

    pub overlay: OverlaySpec,

    pub encoding: EncodingOptions,
}

impl ExportJob {
    /// Build a job for a loaded project. Without an explicit output the
    /// configured file name inside the project's `exports/` is used.
    pub fn for_project(
        loaded: &LoadedMatch,
        config: &AppConfig,
        output: Option<PathBuf>,
    ) -> Result<Self, ExportError> {
        let source = loaded
            .source_path()
            .ok_or_else(|| ExportError::SourceUnreadable {
                path: loaded.root.clone(),
                reason: "project has no source media attached".to_string(),
            })?;
        Ok(Self {
            source,
            output: output.unwrap_or_else(|| loaded.exports_dir().join(&config.export.output_name)),
            overlay: OverlaySpec::for_teams(&config.overlay, &loaded.project.teams),
            encoding: EncodingOptions::from(&config.export),
        })
    }
}

/// What a finished export produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub output: PathBuf,
    pub clips: usize,
    pub final_score: ScoreState,
}

/// Drives a [`MediaProcessor`] through extract, overlay, concatenate and write.
pub struct ExportPipeline {
    processor: Box<dyn MediaProcessor>,
    encoding: EncodingOptions,
    progress: Option<ProgressCallback>,
    cancel: Arc<AtomicBool>,
}

impl ExportPipeline {
    pub fn new(processor: Box<dyn MediaProcessor>, encoding: EncodingOptions) -> Self {
        Self {
            processor,
            encoding,
            progress: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Share an external stop flag.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Render `clips` from `source` into `output`.
    ///
    /// The file is written to a hidden sibling first and renamed into place
    /// only once the write completes; on any failure the partial file is
    /// removed.
    pub fn render(
        &mut self,
        source: &Path,
        clips: &[ClipRange],
        overlay: &OverlaySpec,
        output: &Path,
    ) -> Result<(), ExportError> {
        if clips.is_empty() {
            return Err(ExportError::NoClips);
        }

        tracing::info!(
            source = %source.display(),
            output = %output.display(),
            clips = clips.len(),
            processor = self.processor.name(),
            "Starting export"
        );
        let started = std::time::Instant::now();
        let partial = partial_path(output);

        let result = self.render_inner(source, clips, overlay, output, &partial);
        match &result {
            Ok(()) => {
                self.report(ExportProgress::new(
                    ExportStage::Complete,
                    clips.len(),
                    clips.len(),
                    1.0,
                ));
                tracing::info!(
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    output = %output.display(),
                    "Export finished"
                );
            }
            Err(err) => {
                if partial.exists() {
                    if let Err(remove_err) = std::fs::remove_file(&partial) {
                        tracing::warn!(
                            path = %partial.display(),
                            error = %remove_err,
                            "Failed to remove partial export"
                        );
                    }
                }
                self.report(ExportProgress::new(ExportStage::Failed, 0, clips.len(), 0.0));
                tracing::warn!(error = %err, "Export failed");
            }
        }
        result
    }

    fn render_inner(
        &mut self,
        source: &Path,
        clips: &[ClipRange],
        overlay: &OverlaySpec,
        output: &Path,
        partial: &Path,
    ) -> Result<(), ExportError> {
        let total = clips.len();
        self.report(ExportProgress::new(ExportStage::Preparing, 0, total, 0.0));
        self.processor.open_source(source)?;

        let mut segments = Vec::with_capacity(total);
        for composition in compose_overlays(clips, overlay) {
            self.check_cancelled()?;
            let clip = composition.clip;
            if clip.duration_ms() == 0 {
                // The point still counts toward later overlays.
                tracing::debug!(
                    at_ms = clip.start_ms,
                    score = %composition.score,
                    "Skipping zero-length clip"
                );
                continue;
            }
            let mut segment = self
                .processor
                .extract_segment(source, clip.start_ms, clip.end_ms)?;
            segment = self.processor.overlay_text(segment, composition.text)?;
            if let Some(image) = composition.image {
                segment = self.processor.overlay_image(segment, image)?;
            }
            tracing::debug!(
                start_ms = clip.start_ms,
                end_ms = clip.end_ms,
                score = %composition.score,
                "Composed clip"
            );
            segments.push(segment);
        }

        if segments.is_empty() {
            return Err(ExportError::NoClips);
        }
        let stream = self.processor.concatenate(segments)?;
        self.check_cancelled()?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ExportError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let progress = &self.progress;
        let forward = |report: ExportProgress| {
            if let Some(cb) = progress {
                cb(report);
            }
        };
        let control = WriteControl::new(&self.cancel, &forward);
        self.processor
            .write(&stream, partial, &self.encoding, &control)?;
        self.check_cancelled()?;

        self.report(ExportProgress::new(ExportStage::Finalizing, total, total, 1.0));
        std::fs::rename(partial, output).map_err(|e| ExportError::Io {
            path: output.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), ExportError> {
        if self.cancel.load(Ordering::SeqCst) {
            tracing::info!("Export cancellation requested");
            return Err(ExportError::Cancelled);
        }
        Ok(())
    }

    fn report(&self, progress: ExportProgress) {
        if let Some(cb) = &self.progress {
            cb(progress);
        }
    }
}

/// Plan clips from `markers` and render them.
pub fn export_markers(
    job: &ExportJob,
    markers: &[Marker],
    processor: Box<dyn MediaProcessor>,
    progress: Option<ProgressCallback>,
    cancel: Arc<AtomicBool>,
) -> Result<ExportSummary, ExportError> {
    let clips = plan(markers)?;
    let final_score = compose_overlays(&clips, &job.overlay)
        .last()
        .map(|c| c.score)
        .unwrap_or_default();

    let mut pipeline = ExportPipeline::new(processor, job.encoding.clone()).with_cancel(cancel);
    if let Some(progress) = progress {
        pipeline = pipeline.with_progress(progress);
    }
    pipeline.render(&job.source, &clips, &job.overlay, &job.output)?;

    Ok(ExportSummary {
        output: job.output.clone(),
        clips: clips.len(),
        final_score,
    })
}

/// A running background export.
pub struct ExportHandle {
    cancel: Arc<AtomicBool>,
    task: tokio::task::JoinHandle<Result<ExportSummary, ExportError>>,
}

impl ExportHandle {
    /// Ask the export to stop. The partial output is discarded.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Flag shared with the worker, for cancelling from another task.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(self) -> Result<ExportSummary, ExportError> {
        self.task
            .await
            .map_err(|e| ExportError::Media(format!("Export task failed: {e}")))?
    }
}

/// Run [`export_markers`] on a blocking worker thread.
///
/// Must be called inside a Tokio runtime.
pub fn spawn_export(
    job: ExportJob,
    markers: Vec<Marker>,
    processor: Box<dyn MediaProcessor>,
    progress: Option<ProgressCallback>,
) -> ExportHandle {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    let task = tokio::task::spawn_blocking(move || {
        export_markers(&job, &markers, processor, progress, flag)
    });
    ExportHandle { cancel, task }
}

/// Hidden sibling used while the output is being written, keeping the
/// extension so muxers can still infer the container.
pub fn partial_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match output.extension() {
        Some(ext) => format!(".{stem}.partial.{}", ext.to_string_lossy()),
        None => format!(".{stem}.partial"),
    };
    output.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_path_keeps_extension() {
        assert_eq!(
            partial_path(Path::new("/tmp/exports/output.mp4")),
            PathBuf::from("/tmp/exports/.output.partial.mp4")
        );
        assert_eq!(
            partial_path(Path::new("highlights")),
            PathBuf::from(".highlights.partial")
        );
    }

    #[test]
    fn test_progress_is_clamped() {
        let report = ExportProgress::new(ExportStage::Rendering, 1, 2, 1.7);
        assert_eq!(report.progress, 1.0);
    }

    #[test]
    fn test_plan_errors_keep_their_category() {
        let err: RallymarkError = ExportError::Plan(PlanError::DanglingServe(1_000)).into();
        assert!(matches!(err, RallymarkError::Planning { .. }));

        let err: RallymarkError = ExportError::NoClips.into();
        assert!(matches!(err, RallymarkError::Export { .. }));
    }
}
