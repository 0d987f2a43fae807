//! ffmpeg-backed media processor.
//!
//! Each segment is encoded on its own with a `-ss`/`-t` input window and a
//! filter graph that composites scoreboard images and draws the score text.
//! The encoded segments are then joined with the concat demuxer.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use rallymark_project_model::marker::TimestampMs;

use crate::compositor::ClipComposition;
use crate::export::{ExportError, ExportProgress, ExportStage};
use crate::media::{
    EncodingOptions, MediaProcessor, OverlayPosition, Segment, Stream, WriteControl,
};

/// How far into a clip the preview frame is taken.
pub const PREVIEW_OFFSET_MS: TimestampMs = 1_000;

/// [`MediaProcessor`] that shells out to `ffmpeg`/`ffprobe`.
#[derive(Debug, Clone)]
pub struct FfmpegProcessor {
    ffmpeg: String,
    ffprobe: String,
    work_root: PathBuf,
}

impl Default for FfmpegProcessor {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            work_root: std::env::temp_dir(),
        }
    }
}

impl FfmpegProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory under which per-export scratch directories are created.
    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = root.into();
        self
    }

    /// Check that both binaries are on `PATH`.
    pub fn is_available(&self) -> bool {
        command_exists(&self.ffmpeg) && command_exists(&self.ffprobe)
    }

    /// Write a single PNG frame of `composition`, taken
    /// [`PREVIEW_OFFSET_MS`] into the clip (or its last frame if shorter).
    pub fn render_preview(
        &self,
        source: &Path,
        composition: &ClipComposition,
        output: &Path,
    ) -> Result<(), ExportError> {
        let clip = composition.clip;
        let offset = PREVIEW_OFFSET_MS.min(clip.duration_ms().saturating_sub(1));
        let segment = Segment {
            source: source.to_path_buf(),
            start_ms: clip.start_ms,
            end_ms: clip.end_ms,
            texts: vec![composition.text.clone()],
            images: composition.image.clone().into_iter().collect(),
        };

        let work = WorkDir::create(&self.work_root, "preview")?;
        let text_files = work.write_texts(0, &segment)?;

        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-ss".to_string(),
            secs(clip.start_ms + offset),
            "-i".to_string(),
            source.display().to_string(),
        ];
        for image in &segment.images {
            args.push("-i".to_string());
            args.push(image.path.display().to_string());
        }
        args.extend([
            "-filter_complex".to_string(),
            filter_graph(&segment, &text_files),
            "-map".to_string(),
            "[vout]".to_string(),
            "-frames:v".to_string(),
            "1".to_string(),
            output.display().to_string(),
        ]);

        let out = Command::new(&self.ffmpeg)
            .args(&args)
            .output()
            .map_err(|e| ExportError::Media(format!("Failed to start ffmpeg: {e}")))?;
        if !out.status.success() {
            return Err(ExportError::Media(format!(
                "ffmpeg preview failed (status {}): {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        tracing::info!(output = %output.display(), "Wrote preview frame");
        Ok(())
    }

    fn run_ffmpeg(
        &self,
        args: &[String],
        control: &WriteControl<'_>,
        on_progress: impl Fn(TimestampMs),
    ) -> Result<(), ExportError> {
        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut child = Command::new(&self.ffmpeg)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExportError::Media(format!("Failed to start ffmpeg: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExportError::Media("Failed to capture ffmpeg stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExportError::Media("Failed to capture ffmpeg stderr".to_string()))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        let mut state = ProgressState::default();
        loop {
            if control.is_cancelled() {
                tracing::info!(pid = child.id(), "Stopping ffmpeg");
                let _ = child.kill();
                let _ = child.wait();
                let _ = stderr_task.join();
                return Err(ExportError::Cancelled);
            }

            line.clear();
            let bytes = reader
                .read_line(&mut line)
                .map_err(|e| ExportError::Media(format!("Failed reading ffmpeg progress: {e}")))?;
            if bytes == 0 {
                break;
            }
            if let Some((key, value)) = line.trim().split_once('=') {
                state.update(key, value);
                if key == "progress" {
                    on_progress(state.out_time_ms);
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| ExportError::Media(format!("Failed to wait on ffmpeg: {e}")))?;
        tracing::debug!(
            complete = state.complete,
            out_time_ms = state.out_time_ms,
            "ffmpeg exited"
        );
        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(ExportError::Media(format!(
                "ffmpeg failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }
        Ok(())
    }
}

impl MediaProcessor for FfmpegProcessor {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn open_source(&mut self, source: &Path) -> Result<(), ExportError> {
        if !source.is_file() {
            return Err(ExportError::SourceUnreadable {
                path: source.to_path_buf(),
                reason: "file not found".to_string(),
            });
        }

        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=codec_type",
                "-of",
                "csv=p=0",
            ])
            .arg(source)
            .output()
            .map_err(|e| ExportError::Media(format!("Failed to start ffprobe: {e}")))?;

        let has_video = String::from_utf8_lossy(&output.stdout)
            .lines()
            .any(|l| l.trim() == "video");
        if !output.status.success() || !has_video {
            return Err(ExportError::SourceUnreadable {
                path: source.to_path_buf(),
                reason: format!(
                    "no decodable video stream ({})",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }

    fn write(
        &mut self,
        stream: &Stream,
        output: &Path,
        encoding: &EncodingOptions,
        control: &WriteControl<'_>,
    ) -> Result<(), ExportError> {
        if !command_exists(&self.ffmpeg) {
            return Err(ExportError::Media(format!(
                "{} not found in PATH",
                self.ffmpeg
            )));
        }

        let total = stream.segments.len();
        let total_ms = stream.duration_ms().max(1);
        let work = WorkDir::create(&self.work_root, "export")?;
        let mut encoded = Vec::with_capacity(total);
        let mut done_ms: TimestampMs = 0;

        for (index, segment) in stream.segments.iter().enumerate() {
            if control.is_cancelled() {
                return Err(ExportError::Cancelled);
            }
            let text_files = work.write_texts(index, segment)?;
            let target = work.path.join(format!("segment_{index:04}.mp4"));
            let args = segment_args(segment, &text_files, encoding, &target);

            self.run_ffmpeg(&args, control, |out_ms| {
                let overall = (done_ms + out_ms.min(segment.duration_ms())) as f64 / total_ms as f64;
                control.report(ExportProgress::new(
                    ExportStage::Rendering,
                    index,
                    total,
                    overall,
                ));
            })?;

            done_ms += segment.duration_ms();
            encoded.push(target);
            control.report(ExportProgress::new(
                ExportStage::Rendering,
                index + 1,
                total,
                done_ms as f64 / total_ms as f64,
            ));
            tracing::debug!(segment = index, total, "Segment encoded");
        }

        control.report(ExportProgress::new(ExportStage::Concatenating, total, total, 1.0));
        let list = work.path.join("segments.txt");
        std::fs::write(&list, concat_list(&encoded)).map_err(|e| ExportError::Io {
            path: list.clone(),
            source: e,
        })?;
        let args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-progress".to_string(),
            "pipe:1".to_string(),
            "-nostats".to_string(),
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            list.display().to_string(),
            "-c".to_string(),
            "copy".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            output.display().to_string(),
        ];
        self.run_ffmpeg(&args, control, |_| {})?;
        Ok(())
    }
}

/// Arguments that encode one segment into `target`.
fn segment_args(
    segment: &Segment,
    text_files: &[PathBuf],
    encoding: &EncodingOptions,
    target: &Path,
) -> Vec<String> {
    let duration = secs(segment.duration_ms());
    let mut args = vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-nostdin".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-progress".to_string(),
        "pipe:1".to_string(),
        "-nostats".to_string(),
        "-ss".to_string(),
        secs(segment.start_ms),
        "-t".to_string(),
        duration.clone(),
        "-i".to_string(),
        segment.source.display().to_string(),
    ];
    for image in &segment.images {
        args.extend([
            "-loop".to_string(),
            "1".to_string(),
            "-t".to_string(),
            duration.clone(),
            "-i".to_string(),
            image.path.display().to_string(),
        ]);
    }
    args.extend([
        "-filter_complex".to_string(),
        filter_graph(segment, text_files),
        "-map".to_string(),
        "[vout]".to_string(),
        "-map".to_string(),
        "0:a?".to_string(),
    ]);
    args.extend(codec_args(encoding));
    args.push(target.display().to_string());
    args
}

fn codec_args(encoding: &EncodingOptions) -> Vec<String> {
    vec![
        "-r".to_string(),
        encoding.fps.max(1).to_string(),
        "-c:v".to_string(),
        encoding.video_codec.clone(),
        "-preset".to_string(),
        encoding.preset.clone(),
        "-crf".to_string(),
        encoding.crf.to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        format!("{}k", encoding.audio_bitrate_kbps.max(64)),
        "-ar".to_string(),
        "48000".to_string(),
    ]
}

/// Build the per-segment filter graph: images first, then text, ending in
/// the `[vout]` label. Image `k` is expected as input `k + 1`.
fn filter_graph(segment: &Segment, text_files: &[PathBuf]) -> String {
    let mut steps = Vec::new();
    let mut label = "0:v".to_string();

    for (k, image) in segment.images.iter().enumerate() {
        let next = format!("img{k}");
        let OverlayPosition::TopCenter { margin } = image.position;
        steps.push(format!(
            "[{label}][{input}:v]overlay=x=(W-w)/2:y={margin}:enable='between(t,0,{end})'[{next}]",
            input = k + 1,
            end = secs(image.duration_ms),
        ));
        label = next;
    }

    for (k, (text, file)) in segment.texts.iter().zip(text_files).enumerate() {
        let next = format!("txt{k}");
        let OverlayPosition::TopCenter { margin } = text.position;
        steps.push(format!(
            "[{label}]drawtext=textfile='{file}':expansion=none:fontsize={size}:fontcolor=white:\
             box=1:boxcolor=black@0.6:boxborderw=12:x=(w-text_w)/2:y={margin}:\
             enable='between(t,0,{end})'[{next}]",
            file = escape_filter_path(file),
            size = text.font_size,
            end = secs(text.duration_ms),
        ));
        label = next;
    }

    steps.push(format!("[{label}]format=yuv420p[vout]"));
    steps.join(";")
}

fn concat_list(files: &[PathBuf]) -> String {
    files
        .iter()
        .map(|f| format!("file '{}'\n", f.display().to_string().replace('\'', "'\\''")))
        .collect()
}

fn escape_filter_path(path: &Path) -> String {
    path.display()
        .to_string()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

fn secs(ms: TimestampMs) -> String {
    format!("{}.{:03}", ms / 1_000, ms % 1_000)
}

pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Scratch directory removed on drop.
struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    fn create(root: &Path, purpose: &str) -> Result<Self, ExportError> {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or_default();
        let path = root.join(format!(
            "rallymark_{purpose}_{}_{nanos:09}",
            std::process::id()
        ));
        std::fs::create_dir_all(&path).map_err(|e| ExportError::Io {
            path: path.clone(),
            source: e,
        })?;
        Ok(Self { path })
    }

    /// Write each text layer of `segment` to its own file for `textfile=`.
    fn write_texts(&self, index: usize, segment: &Segment) -> Result<Vec<PathBuf>, ExportError> {
        segment
            .texts
            .iter()
            .enumerate()
            .map(|(k, layer)| {
                let path = self.path.join(format!("segment_{index:04}_text_{k}.txt"));
                std::fs::write(&path, &layer.text).map_err(|e| ExportError::Io {
                    path: path.clone(),
                    source: e,
                })?;
                Ok(path)
            })
            .collect()
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_dir_all(&self.path) {
            tracing::debug!(path = %self.path.display(), error = %err, "Failed to remove scratch dir");
        }
    }
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_ms: TimestampMs,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both keys.
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.parse::<u64>() {
                    self.out_time_ms = us / 1_000;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{ImageLayer, TextLayer};

    fn segment() -> Segment {
        Segment {
            source: PathBuf::from("/media/match.mp4"),
            start_ms: 61_250,
            end_ms: 66_000,
            texts: vec![TextLayer {
                text: "Home 2 - 1 Away".to_string(),
                font_size: 48,
                position: OverlayPosition::TopCenter { margin: 24 },
                duration_ms: 4_750,
            }],
            images: vec![],
        }
    }

    #[test]
    fn test_secs_formatting() {
        assert_eq!(secs(0), "0.000");
        assert_eq!(secs(61_250), "61.250");
        assert_eq!(secs(5), "0.005");
    }

    #[test]
    fn test_filter_graph_text_only() {
        let graph = filter_graph(&segment(), &[PathBuf::from("/tmp/w/t0.txt")]);
        assert!(graph.starts_with("[0:v]drawtext=textfile='/tmp/w/t0.txt':expansion=none"));
        assert!(graph.contains("x=(w-text_w)/2:y=24"));
        assert!(graph.contains("enable='between(t,0,4.750)'"));
        assert!(graph.ends_with("[txt0]format=yuv420p[vout]"));
    }

    #[test]
    fn test_filter_graph_image_then_text() {
        let mut segment = segment();
        segment.images.push(ImageLayer {
            path: PathBuf::from("board.png"),
            position: OverlayPosition::TopCenter { margin: 10 },
            duration_ms: 4_750,
        });
        let graph = filter_graph(&segment, &[PathBuf::from("t.txt")]);
        let steps: Vec<&str> = graph.split(';').collect();
        assert_eq!(steps.len(), 3);
        assert!(steps[0].starts_with("[0:v][1:v]overlay=x=(W-w)/2:y=10"));
        assert!(steps[1].starts_with("[img0]drawtext="));
        assert_eq!(steps[2], "[txt0]format=yuv420p[vout]");
    }

    #[test]
    fn test_segment_args_window_and_codec() {
        let encoding = EncodingOptions::default();
        let args = segment_args(
            &segment(),
            &[PathBuf::from("t.txt")],
            &encoding,
            Path::new("/tmp/w/segment_0000.mp4"),
        );
        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("-ss") + 1], "61.250");
        assert_eq!(args[pos("-t") + 1], "4.750");
        assert_eq!(args[pos("-c:v") + 1], "libx264");
        assert_eq!(args[pos("-crf") + 1], "20");
        assert_eq!(args[pos("-r") + 1], "30");
        assert_eq!(args.last().unwrap(), "/tmp/w/segment_0000.mp4");
    }

    #[test]
    fn test_concat_list_quotes_paths() {
        let list = concat_list(&[PathBuf::from("/a/seg_0.mp4"), PathBuf::from("/a/it's.mp4")]);
        assert_eq!(list, "file '/a/seg_0.mp4'\nfile '/a/it'\\''s.mp4'\n");
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(escape_filter_path(Path::new("C:\\tmp\\a.txt")), "C\\:/tmp/a.txt");
    }

    #[test]
    fn test_progress_state_parsing() {
        let mut state = ProgressState::default();
        state.update("out_time_us", "2500000");
        assert_eq!(state.out_time_ms, 2_500);
        state.update("out_time_ms", "3000000");
        assert_eq!(state.out_time_ms, 3_000);
        state.update("progress", "end");
        assert!(state.complete);
    }

    #[test]
    fn test_open_source_missing_file() {
        let err = FfmpegProcessor::new()
            .open_source(Path::new("/definitely/not/here.mp4"))
            .unwrap_err();
        assert!(matches!(err, ExportError::SourceUnreadable { .. }));
    }

    #[test]
    fn test_work_dir_removed_on_drop() {
        let work = WorkDir::create(&std::env::temp_dir(), "unit").unwrap();
        let path = work.path.clone();
        let files = work.write_texts(0, &segment()).unwrap();
        assert_eq!(std::fs::read_to_string(&files[0]).unwrap(), "Home 2 - 1 Away");
        drop(work);
        assert!(!path.exists());
    }
}
