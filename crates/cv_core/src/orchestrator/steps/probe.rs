//! Probe step - measures the extracted track's duration with ffprobe.
//!
//! The duration drives the chunk plan, so anything unparsable or
//! non-positive stops the run before any chunk is cut.

use crate::media::probe::probe_duration;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};

/// Probe step measuring the working track's duration.
pub struct ProbeStep;

impl ProbeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProbeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ProbeStep {
    fn name(&self) -> &str {
        "Probe Duration"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let audio = state
            .extracted_audio
            .clone()
            .ok_or_else(|| StepError::precondition_failed("audio not extracted"))?;

        let duration = probe_duration(&ctx.settings.tools.ffprobe, &audio, &ctx.logger)?;
        ctx.logger
            .info(&format!("Media duration: {:.3}s", duration));
        state.duration = Some(duration);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match state.duration {
            Some(d) if d > 0.0 => Ok(()),
            Some(d) => Err(StepError::invalid_output(format!(
                "probed duration is not positive: {d}"
            ))),
            None => Err(StepError::invalid_output("duration not recorded")),
        }
    }
}
