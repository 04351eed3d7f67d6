//! Top-level engine: media dispatch and run lifecycle.
//!
//! The engine classifies the input, runs the isolation pipeline on its
//! audio, and for video inputs remuxes the isolated track back against
//! the untouched video stream. Scratch directories are removed when the
//! run ends, whether it succeeded or not.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use crate::config::Settings;
use crate::logging::{LogCallback, LogConfig, RunLogger};
use crate::media::ffmpeg::remux_audio_video;
use crate::media::probe::{probe_media_kind, MediaKind};
use crate::orchestrator::{
    create_isolation_pipeline, Context, JobState, PipelineError, PipelineResult, ProgressCallback,
    StepError,
};

/// Result of a completed isolation run.
#[derive(Debug, Clone)]
pub struct IsolationOutput {
    /// The isolated audio track.
    pub audio_path: PathBuf,
    /// The remuxed video, present only for video inputs.
    pub video_path: Option<PathBuf>,
    /// The run's log file.
    pub log_path: PathBuf,
}

/// Speech isolation engine.
///
/// Holds validated settings and runs one input at a time.
pub struct Engine {
    settings: Settings,
    keep_scratch: bool,
    log_callback: Option<LogCallback>,
    progress_callback: Option<ProgressCallback>,
}

impl Engine {
    /// Create an engine from validated settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            keep_scratch: false,
            log_callback: None,
            progress_callback: None,
        }
    }

    /// Keep the scratch chunk directories after the run (for debugging).
    pub fn with_keep_scratch(mut self, keep: bool) -> Self {
        self.keep_scratch = keep;
        self
    }

    /// Forward run-log lines to a callback.
    pub fn with_log_callback(mut self, callback: LogCallback) -> Self {
        self.log_callback = Some(callback);
        self
    }

    /// Receive step-level progress updates.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// The settings this engine runs with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Isolate speech from a media file.
    ///
    /// Audio inputs produce `<stem>_isolated_audio.wav` in the output
    /// folder. Video inputs additionally produce
    /// `<stem>_processed_video.mp4` with the original video stream
    /// copied over the isolated track.
    pub fn isolate(mut self, input: &Path) -> PipelineResult<IsolationOutput> {
        let run_name = run_name_for(input);

        if !input.exists() {
            return Err(PipelineError::validation_failed(
                &run_name,
                format!("input file not found: {}", input.display()),
            ));
        }

        let kind = probe_media_kind(&self.settings.tools.ffprobe, input)
            .map_err(|e| {
                PipelineError::step_failed(&run_name, "Classify Media", StepError::Probe(e))
            })?;

        if kind == MediaKind::Unsupported {
            return Err(PipelineError::unsupported_media(
                &run_name,
                "no audio or video streams found",
            ));
        }

        let output_dir = PathBuf::from(&self.settings.paths.output_folder);
        let work_dir = PathBuf::from(&self.settings.paths.temp_root).join(&run_name);
        let audio_output = output_dir.join(isolated_audio_name(&run_name));

        for dir in [&output_dir, &work_dir] {
            fs::create_dir_all(dir).map_err(|e| {
                PipelineError::setup_failed(
                    &run_name,
                    format!("could not create {}: {e}", dir.display()),
                )
            })?;
        }

        let log_config = LogConfig::from_settings(&self.settings.logging);
        let logger = RunLogger::new(
            &run_name,
            &self.settings.paths.logs_folder,
            log_config,
            self.log_callback.take(),
        )
        .map_err(|e| {
            PipelineError::setup_failed(&run_name, format!("could not create run log: {e}"))
        })?;
        let logger = Arc::new(logger);
        let log_path = logger.log_path().to_path_buf();

        logger.info(&format!(
            "Input: {} ({})",
            input.display(),
            match kind {
                MediaKind::Video => "video",
                MediaKind::Audio => "audio",
                MediaKind::Unsupported => "unsupported",
            }
        ));

        let mut ctx = Context::new(
            input.to_path_buf(),
            self.settings.clone(),
            &run_name,
            work_dir.clone(),
            audio_output.clone(),
            Arc::clone(&logger),
        );
        if let Some(callback) = self.progress_callback.take() {
            ctx = ctx.with_progress_callback(callback);
        }

        let run_id = format!("{}-{}", run_name, chrono::Local::now().format("%Y%m%d-%H%M%S"));
        let mut state = JobState::new(run_id);

        let pipeline = create_isolation_pipeline();
        let run_result = pipeline.run(&ctx, &mut state);

        // Scratch cleanup happens regardless of the run's outcome.
        if self.keep_scratch {
            logger.info(&format!("Keeping scratch directory {}", work_dir.display()));
        } else {
            cleanup_scratch(&work_dir);
        }

        run_result?;

        let video_path = match kind {
            MediaKind::Video => {
                logger.phase("Remux");
                let video_output = output_dir.join(processed_video_name(&run_name));
                remux_audio_video(
                    &self.settings.tools.ffmpeg,
                    input,
                    &audio_output,
                    &video_output,
                    &logger,
                )
                .map_err(|e| {
                    logger.error(&format!("Remux failed: {e}"));
                    PipelineError::step_failed(&run_name, "Remux", StepError::Remux(e))
                })?;
                logger.success(&format!("Wrote {}", video_output.display()));
                Some(video_output)
            }
            _ => None,
        };

        logger.success(&format!("Wrote {}", audio_output.display()));

        Ok(IsolationOutput {
            audio_path: audio_output,
            video_path,
            log_path,
        })
    }
}

/// Derive the run name from the input file stem.
fn run_name_for(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "run".to_string())
}

/// Output file name for the isolated audio track.
fn isolated_audio_name(stem: &str) -> String {
    format!("{stem}_isolated_audio.wav")
}

/// Output file name for the remuxed video.
fn processed_video_name(stem: &str) -> String {
    format!("{stem}_processed_video.mp4")
}

/// Remove the run's scratch directory, logging rather than failing.
fn cleanup_scratch(work_dir: &Path) {
    if !work_dir.exists() {
        return;
    }
    if let Err(e) = fs::remove_dir_all(work_dir) {
        warn!("Could not remove scratch directory {}: {}", work_dir.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_names_follow_the_input_stem() {
        assert_eq!(
            isolated_audio_name("concert"),
            "concert_isolated_audio.wav"
        );
        assert_eq!(
            processed_video_name("concert"),
            "concert_processed_video.mp4"
        );
    }

    #[test]
    fn run_name_uses_file_stem() {
        assert_eq!(run_name_for(Path::new("/media/show.s01e01.mkv")), "show.s01e01");
        assert_eq!(run_name_for(Path::new("track.flac")), "track");
    }

    #[test]
    fn missing_input_fails_validation() {
        let engine = Engine::new(Settings::default());
        let err = engine.isolate(Path::new("/nonexistent/clip.mkv")).unwrap_err();
        assert!(matches!(err, PipelineError::ValidationFailed { .. }));
    }

    #[test]
    fn cleanup_removes_scratch_tree() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("run").join("chunks");
        fs::create_dir_all(&work).unwrap();
        fs::write(work.join("chunk_000.wav"), b"data").unwrap();

        cleanup_scratch(&dir.path().join("run"));
        assert!(!dir.path().join("run").exists());
    }
}
