//! Segment step - cuts the planned chunks out of the extracted track.
//!
//! One ffmpeg invocation per chunk, sequential and fail-fast: the first
//! failing extraction aborts the run carrying its chunk index.

use std::fs;

use crate::filter::SegmentFile;
use crate::media::ffmpeg::extract_segment;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};

/// Segment step producing one WAV file per planned chunk.
pub struct SegmentStep;

impl SegmentStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SegmentStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for SegmentStep {
    fn name(&self) -> &str {
        "Extract Segments"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let audio = state
            .extracted_audio
            .clone()
            .ok_or_else(|| StepError::precondition_failed("audio not extracted"))?;
        let plan = state
            .plan
            .clone()
            .ok_or_else(|| StepError::precondition_failed("chunks not planned"))?;

        let chunks_dir = ctx.chunks_dir();
        fs::create_dir_all(&chunks_dir)
            .map_err(|e| StepError::io_error("creating chunks directory", e))?;

        let total = plan.len();
        let mut segments = Vec::with_capacity(total);
        for span in &plan {
            let chunk_path = chunks_dir.join(format!("chunk_{:03}.wav", span.index));

            extract_segment(
                &ctx.settings.tools.ffmpeg,
                &audio,
                span,
                &chunk_path,
                &ctx.logger,
            )
            .map_err(|e| StepError::chunk_extraction(span.index, e))?;

            let percent = ((span.index + 1) * 100 / total) as u32;
            ctx.report_progress(self.name(), percent, &format!("chunk {}", span.index));
            ctx.logger.progress(percent);

            segments.push(SegmentFile {
                index: span.index,
                path: chunk_path,
            });
        }

        state.segments = Some(segments);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let segments = state
            .segments
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("segments not recorded"))?;

        if segments.len() != state.chunk_count() {
            return Err(StepError::invalid_output(format!(
                "expected {} segments, extracted {}",
                state.chunk_count(),
                segments.len()
            )));
        }

        for segment in segments {
            if !segment.path.exists() {
                return Err(StepError::invalid_output(format!(
                    "segment {} missing: {}",
                    segment.index,
                    segment.path.display()
                )));
            }
        }

        Ok(())
    }
}
