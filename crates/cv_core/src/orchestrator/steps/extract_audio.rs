//! Extract step - pulls the full audio track out of the input.
//!
//! The track is written straight to the final output path as 48 kHz mono
//! PCM. Chunks are cut from this file, and the merge step later
//! overwrites it with the isolated result.

use std::fs;

use crate::media::ffmpeg::extract_audio;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};

/// Extract step producing the working full-track audio file.
pub struct ExtractAudioStep;

impl ExtractAudioStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExtractAudioStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ExtractAudioStep {
    fn name(&self) -> &str {
        "Extract Audio"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        if !ctx.input_path.exists() {
            return Err(StepError::file_not_found(
                ctx.input_path.display().to_string(),
            ));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        if let Some(parent) = ctx.audio_output.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StepError::io_error("creating output directory", e))?;
        }

        ctx.logger.info(&format!(
            "Extracting audio track to {}",
            ctx.audio_output.display()
        ));

        extract_audio(
            &ctx.settings.tools.ffmpeg,
            &ctx.input_path,
            &ctx.audio_output,
            &ctx.logger,
        )
        .map_err(StepError::extraction)?;

        state.extracted_audio = Some(ctx.audio_output.clone());
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let path = state
            .extracted_audio
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("extracted audio not recorded"))?;

        let non_empty = fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
        if !non_empty {
            return Err(StepError::invalid_output(format!(
                "extracted audio missing or empty: {}",
                path.display()
            )));
        }
        Ok(())
    }
}
