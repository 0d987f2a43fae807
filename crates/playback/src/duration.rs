//! Media duration discovery.
//!
//! The duration of a freshly opened file is not known immediately. Instead of
//! re-checking on a timer, a probe runs once in the background and publishes
//! its result through a `watch` channel; callers either read the current
//! value or wait for it with a timeout.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use rallymark_common::clock::secs_to_ms;
use rallymark_common::error::{RallymarkError, RallymarkResult};
use rallymark_project_model::marker::TimestampMs;

/// Something that can report how long a media file is.
#[async_trait::async_trait]
pub trait DurationSource: Send + Sync {
    /// Probe the duration of the file at `path`, in milliseconds.
    async fn probe_duration(&self, path: &Path) -> RallymarkResult<TimestampMs>;

    /// Source name, for logs.
    fn name(&self) -> &str;
}

/// Duration probing via the `ffprobe` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfprobeDuration;

#[async_trait::async_trait]
impl DurationSource for FfprobeDuration {
    async fn probe_duration(&self, path: &Path) -> RallymarkResult<TimestampMs> {
        if !path.exists() {
            return Err(RallymarkError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = tokio::process::Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| RallymarkError::playback(format!("Failed to start ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(RallymarkError::playback(format!(
                "ffprobe failed (status {}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
    }

    fn name(&self) -> &str {
        "ffprobe"
    }
}

/// Parse ffprobe's `format=duration` output (fractional seconds).
pub fn parse_probe_duration(raw: &str) -> RallymarkResult<TimestampMs> {
    let line = raw.lines().next().unwrap_or_default().trim();
    let secs: f64 = line
        .parse()
        .map_err(|_| RallymarkError::playback(format!("Unexpected ffprobe duration '{line}'")))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(RallymarkError::playback(format!(
            "Media reports a non-positive duration ({line})"
        )));
    }
    Ok(secs_to_ms(secs))
}

/// Eventually-known media duration.
#[derive(Debug, Clone)]
pub struct DurationWatch {
    rx: watch::Receiver<Option<TimestampMs>>,
}

impl DurationWatch {
    /// Start probing `path` in the background. Must be called inside a
    /// Tokio runtime.
    pub fn spawn(source: Arc<dyn DurationSource>, path: PathBuf) -> Self {
        let (tx, rx) = watch::channel(None);
        tokio::spawn(async move {
            match source.probe_duration(&path).await {
                Ok(duration_ms) => {
                    tracing::info!(
                        source = source.name(),
                        path = %path.display(),
                        duration_ms,
                        "Media duration ready"
                    );
                    tx.send_replace(Some(duration_ms));
                }
                Err(err) => {
                    tracing::warn!(
                        source = source.name(),
                        path = %path.display(),
                        error = %err,
                        "Media duration probe failed"
                    );
                }
            }
        });
        Self { rx }
    }

    /// A duration that is already known.
    pub fn ready(duration_ms: TimestampMs) -> Self {
        let (_tx, rx) = watch::channel(Some(duration_ms));
        Self { rx }
    }

    /// The duration if the probe has finished.
    pub fn current(&self) -> Option<TimestampMs> {
        *self.rx.borrow()
    }

    /// Wait until the duration is known, up to `timeout`.
    pub async fn wait_ready(&self, timeout: Duration) -> RallymarkResult<TimestampMs> {
        let mut rx = self.rx.clone();
        let waited = tokio::time::timeout(timeout, rx.wait_for(Option::is_some)).await;
        let value = match waited {
            Ok(Ok(guard)) => *guard,
            Ok(Err(_)) => {
                return Err(RallymarkError::playback(
                    "Duration probe finished without a result",
                ))
            }
            Err(_) => {
                return Err(RallymarkError::timeout(format!(
                    "Media duration not available after {}ms",
                    timeout.as_millis()
                )))
            }
        };
        value.ok_or_else(|| RallymarkError::playback("Duration probe finished without a result"))
    }
}
