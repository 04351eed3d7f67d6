//! Plan step - turns the probed duration into overlapping chunk spans.

use crate::chunking::plan_chunks;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};

/// Plan step computing the chunk spans for this run.
pub struct PlanStep;

impl PlanStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlanStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for PlanStep {
    fn name(&self) -> &str {
        "Plan Chunks"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let duration = state
            .duration
            .ok_or_else(|| StepError::precondition_failed("duration not probed"))?;

        let chunking = &ctx.settings.chunking;
        let plan = plan_chunks(duration, chunking.chunk_count, chunking.overlap_duration);

        ctx.logger.info(&format!(
            "Planned {} chunks of ~{:.3}s with {:.3}s overlap",
            plan.len(),
            duration / chunking.chunk_count as f64,
            chunking.overlap_duration
        ));
        for span in &plan {
            ctx.logger.debug(&format!(
                "  chunk {}: {:.6}s - {:.6}s",
                span.index,
                span.start_time,
                span.end_time()
            ));
        }

        state.plan = Some(plan);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        let plan = state
            .plan
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("chunk plan not recorded"))?;

        if plan.len() != ctx.settings.chunking.chunk_count as usize {
            return Err(StepError::invalid_output(format!(
                "expected {} chunks, planned {}",
                ctx.settings.chunking.chunk_count,
                plan.len()
            )));
        }

        // The last chunk must land exactly on the end of the track.
        if let (Some(last), Some(duration)) = (plan.last(), state.duration) {
            if (last.end_time() - duration).abs() > 1e-6 {
                return Err(StepError::invalid_output(format!(
                    "plan ends at {:.6}s but track is {:.6}s",
                    last.end_time(),
                    duration
                )));
            }
        }

        Ok(())
    }
}
