//! Filter step - runs every segment through the suppression model.
//!
//! By default the step shells out to `deep-filter` with the configured
//! attenuation limit; tests and embedders can swap in an in-process
//! backend instead.

use std::fs;

use crate::filter::{filter_segments, worker_count, DeepFilterCommand, FilterBackend};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};

/// Filter step dispatching segments to the worker pool.
pub struct FilterStep {
    backend_override: Option<FilterBackend>,
}

impl FilterStep {
    /// Use the `deep-filter` command backend from settings.
    pub fn new() -> Self {
        Self {
            backend_override: None,
        }
    }

    /// Use a caller-supplied backend instead of the configured command.
    pub fn with_backend(backend: FilterBackend) -> Self {
        Self {
            backend_override: Some(backend),
        }
    }

    fn backend(&self, ctx: &Context) -> FilterBackend {
        match &self.backend_override {
            Some(backend) => backend.clone(),
            None => {
                let filter = &ctx.settings.filter;
                FilterBackend::Command(DeepFilterCommand::new(
                    &filter.deep_filter_path,
                    filter.attenuation_limit,
                    filter.compensate_delay,
                    filter.post_filter,
                ))
            }
        }
    }
}

impl Default for FilterStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for FilterStep {
    fn name(&self) -> &str {
        "Filter"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let segments = state
            .segments
            .clone()
            .ok_or_else(|| StepError::precondition_failed("segments not extracted"))?;

        let processed_dir = ctx.processed_dir();
        fs::create_dir_all(&processed_dir)
            .map_err(|e| StepError::io_error("creating processed chunks directory", e))?;

        let workers = worker_count(
            ctx.settings.workers.use_thread_cap,
            ctx.settings.workers.max_threads_if_capped,
        );
        ctx.logger.info(&format!(
            "Filtering {} segments with {} workers (attenuation limit {})",
            segments.len(),
            workers,
            ctx.settings.filter.attenuation_limit
        ));

        let processed =
            filter_segments(segments, &self.backend(ctx), workers, &processed_dir)?;

        state.processed = Some(processed);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let processed = state
            .processed
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("processed segments not recorded"))?;

        let expected = state.segments.as_ref().map_or(0, Vec::len);
        if processed.len() != expected {
            return Err(StepError::invalid_output(format!(
                "expected {} processed segments, got {}",
                expected,
                processed.len()
            )));
        }

        // Index order is what the merge stage relies on.
        for (i, segment) in processed.iter().enumerate() {
            if segment.index != i {
                return Err(StepError::invalid_output(format!(
                    "processed segments out of order at position {i}"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::filter::{FilterModel, FilterResult, ModelFactory, SegmentFile};
    use crate::logging::{LogConfig, RunLogger};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    struct PassthroughModel;

    impl FilterModel for PassthroughModel {
        fn frame_length(&self) -> usize {
            4
        }

        fn process_frame(&mut self, input: &[f32]) -> FilterResult<Vec<f32>> {
            Ok(input.to_vec())
        }
    }

    struct PassthroughFactory;

    impl ModelFactory for PassthroughFactory {
        fn create(&self) -> FilterResult<Box<dyn FilterModel>> {
            Ok(Box::new(PassthroughModel))
        }
    }

    fn write_segment(dir: &Path, index: usize) -> SegmentFile {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let path = dir.join(format!("chunk_{:03}.wav", index));
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for s in [100i16, -100, 200, -200] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        SegmentFile { index, path }
    }

    #[test]
    fn in_process_backend_filters_all_segments() {
        let dir = tempfile::tempdir().unwrap();
        let chunks = dir.path().join("work").join("chunks");
        std::fs::create_dir_all(&chunks).unwrap();

        let logger = Arc::new(
            RunLogger::new("filter", dir.path().join("logs"), LogConfig::default(), None)
                .unwrap(),
        );
        let ctx = Context::new(
            PathBuf::from("in.wav"),
            Settings::default(),
            "filter",
            dir.path().join("work"),
            dir.path().join("out.wav"),
            logger,
        );

        let mut state = JobState::new("t");
        state.segments = Some((0..3).map(|i| write_segment(&chunks, i)).collect());

        let step = FilterStep::with_backend(FilterBackend::InProcess(Arc::new(
            PassthroughFactory,
        )));
        step.execute(&ctx, &mut state).unwrap();
        step.validate_output(&ctx, &state).unwrap();

        let processed = state.processed.as_ref().unwrap();
        assert_eq!(processed.len(), 3);
        for segment in processed {
            assert!(segment.path.starts_with(ctx.processed_dir()));
            assert!(segment.path.exists());
        }
    }
}
