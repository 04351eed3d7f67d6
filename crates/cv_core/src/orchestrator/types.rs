//! Core types for the orchestrator pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chunking::ChunkSpan;
use crate::config::Settings;
use crate::filter::{ProcessedSegment, SegmentFile};
use crate::logging::RunLogger;

/// Progress callback type for reporting pipeline progress.
///
/// Arguments: (step_name, percent_complete, message)
pub type ProgressCallback = Box<dyn Fn(&str, u32, &str) + Send + Sync>;

/// Read-only context passed to pipeline steps.
///
/// Contains the run configuration and shared resources that steps can
/// read but not modify. Mutable state goes in `JobState`.
pub struct Context {
    /// The media file being processed.
    pub input_path: PathBuf,
    /// Application settings.
    pub settings: Settings,
    /// Run name, derived from the input file stem.
    pub run_name: String,
    /// Run-specific scratch directory (under temp_root).
    pub work_dir: PathBuf,
    /// Where the isolated audio track is written.
    pub audio_output: PathBuf,
    /// Per-run logger.
    pub logger: Arc<RunLogger>,
    /// Optional progress callback.
    progress_callback: Option<ProgressCallback>,
}

impl Context {
    /// Create a new context for a run.
    pub fn new(
        input_path: PathBuf,
        settings: Settings,
        run_name: impl Into<String>,
        work_dir: PathBuf,
        audio_output: PathBuf,
        logger: Arc<RunLogger>,
    ) -> Self {
        Self {
            input_path,
            settings,
            run_name: run_name.into(),
            work_dir,
            audio_output,
            logger,
            progress_callback: None,
        }
    }

    /// Set the progress callback.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Report progress to the callback (if set).
    pub fn report_progress(&self, step_name: &str, percent: u32, message: &str) {
        if let Some(ref callback) = self.progress_callback {
            callback(step_name, percent, message);
        }
    }

    /// Directory holding the raw extracted chunk files.
    pub fn chunks_dir(&self) -> PathBuf {
        self.work_dir.join("chunks")
    }

    /// Directory the filter writes processed chunk files into.
    pub fn processed_dir(&self) -> PathBuf {
        self.work_dir.join("processed_chunks")
    }
}

/// Mutable run state that accumulates results from pipeline steps.
///
/// This is a write-once manifest: steps add new data but do not
/// overwrite what earlier steps recorded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobState {
    /// Unique run identifier.
    pub run_id: String,
    /// When the run started.
    pub started_at: Option<String>,
    /// Track duration in seconds (from the Probe step).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Path of the extracted full audio track.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_audio: Option<PathBuf>,
    /// Planned chunk spans (from the Plan step).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Vec<ChunkSpan>>,
    /// Extracted per-chunk files (from the Segment step).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<SegmentFile>>,
    /// Filtered per-chunk files (from the Filter step).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed: Option<Vec<ProcessedSegment>>,
    /// Merge results (from the Merge step).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeOutput>,
}

impl JobState {
    /// Create a new run state with the given ID.
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    /// Check if the duration probe has completed.
    pub fn has_duration(&self) -> bool {
        self.duration.is_some()
    }

    /// Check if chunk planning has completed.
    pub fn has_plan(&self) -> bool {
        self.plan.is_some()
    }

    /// Number of planned chunks, zero before planning.
    pub fn chunk_count(&self) -> usize {
        self.plan.as_ref().map_or(0, Vec::len)
    }
}

/// Output from the Merge step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeOutput {
    /// Path to the merged, continuous audio track.
    pub output_path: PathBuf,
    /// Number of segments that went into the merge.
    pub segment_count: usize,
}

/// Result of executing a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed successfully.
    Success,
    /// Step was skipped (preconditions not met, but not an error).
    Skipped(String),
}
