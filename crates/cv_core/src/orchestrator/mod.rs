//! Pipeline orchestrator for coordinating isolation runs.
//!
//! This module provides the infrastructure for running multi-step
//! processing pipelines. Each run consists of a sequence of steps that
//! validate, execute, and record their results.
//!
//! # Architecture
//!
//! ```text
//! Pipeline
//!     ├── Step: Extract Audio
//!     ├── Step: Probe Duration
//!     ├── Step: Plan Chunks
//!     ├── Step: Extract Segments
//!     ├── Step: Filter
//!     └── Step: Merge
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cv_core::orchestrator::{create_isolation_pipeline, Context, JobState};
//!
//! let pipeline = create_isolation_pipeline();
//! let ctx = Context::new(input, settings, "concert", work_dir, output, logger);
//! let mut state = JobState::new("run-123");
//!
//! let result = pipeline.run(&ctx, &mut state)?;
//! println!("Completed: {:?}", result.steps_completed);
//! ```

mod errors;
mod pipeline;
mod step;
pub mod steps;
mod types;

pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::{Pipeline, PipelineRunResult};
pub use step::PipelineStep;
pub use steps::{ExtractAudioStep, FilterStep, MergeStep, PlanStep, ProbeStep, SegmentStep};
pub use types::{Context, JobState, MergeOutput, ProgressCallback, StepOutcome};

/// Create the standard isolation pipeline with all steps in order.
///
/// 1. Extract Audio - pull the full audio track to PCM WAV
/// 2. Probe Duration - measure the working track
/// 3. Plan Chunks - compute overlapping chunk spans
/// 4. Extract Segments - cut one file per chunk
/// 5. Filter - suppress non-speech in parallel
/// 6. Merge - crossfade the filtered chunks back together
pub fn create_isolation_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(ExtractAudioStep::new())
        .with_step(ProbeStep::new())
        .with_step(PlanStep::new())
        .with_step(SegmentStep::new())
        .with_step(FilterStep::new())
        .with_step(MergeStep::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_pipeline_has_all_steps_in_order() {
        let pipeline = create_isolation_pipeline();
        assert_eq!(
            pipeline.step_names(),
            vec![
                "Extract Audio",
                "Probe Duration",
                "Plan Chunks",
                "Extract Segments",
                "Filter",
                "Merge"
            ]
        );
    }
}
