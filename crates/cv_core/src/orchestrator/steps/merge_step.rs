//! Merge step - crossfades the filtered segments back into one track.
//!
//! Overwrites the working audio file with the final isolated track.

use std::fs;

use crate::merge::merge_segments;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, MergeOutput, StepOutcome};

/// Merge step producing the continuous isolated audio track.
pub struct MergeStep;

impl MergeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MergeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for MergeStep {
    fn name(&self) -> &str {
        "Merge"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let processed = state
            .processed
            .clone()
            .ok_or_else(|| StepError::precondition_failed("segments not filtered"))?;

        ctx.logger.info(&format!(
            "Merging {} filtered segments into {}",
            processed.len(),
            ctx.audio_output.display()
        ));

        merge_segments(
            &ctx.settings.tools.ffmpeg,
            &processed,
            ctx.settings.chunking.overlap_duration,
            &ctx.audio_output,
            &ctx.logger,
        )
        .map_err(StepError::Merge)?;

        state.merge = Some(MergeOutput {
            output_path: ctx.audio_output.clone(),
            segment_count: processed.len(),
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.merge.is_none() {
            return Err(StepError::invalid_output("merge result not recorded"));
        }

        let non_empty = fs::metadata(&ctx.audio_output)
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if !non_empty {
            return Err(StepError::invalid_output(format!(
                "merged output missing or empty: {}",
                ctx.audio_output.display()
            )));
        }

        Ok(())
    }
}
