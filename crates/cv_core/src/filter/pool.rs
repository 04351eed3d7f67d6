//! Worker pool running the filter stage in parallel.
//!
//! Jobs go down one mpsc channel shared by all workers behind a mutex;
//! results come back on another. Each worker owns its backend state
//! exclusively (for the in-process backend, a model instance created at
//! startup and released when the worker exits). The pool joins every
//! worker before returning, so no thread outlives the call.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::model::{DeepFilterCommand, ModelFactory};
use super::{stream, FilterError, FilterResult};

/// Cores left free for ffmpeg and the rest of the system.
pub const HARDWARE_MARGIN: usize = 2;

/// Worker count used when hardware concurrency cannot be queried.
pub const DEFAULT_WORKER_COUNT: usize = 6;

/// One extracted segment awaiting filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentFile {
    pub index: usize,
    pub path: PathBuf,
}

/// One filtered segment, ready for the merge stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedSegment {
    pub index: usize,
    pub path: PathBuf,
}

/// How a worker filters a segment.
#[derive(Clone)]
pub enum FilterBackend {
    /// Spawn the `deep-filter` executable once per segment.
    Command(DeepFilterCommand),
    /// Stream frames through an in-process model, one instance per worker.
    InProcess(Arc<dyn ModelFactory>),
}

/// Number of workers to run, honoring the configured cap.
///
/// Hardware concurrency minus [`HARDWARE_MARGIN`], never below one;
/// [`DEFAULT_WORKER_COUNT`] when the hardware count is unavailable.
pub fn worker_count(use_thread_cap: bool, max_threads_if_capped: u32) -> usize {
    let hardware = thread::available_parallelism()
        .ok()
        .map(NonZeroUsize::get);
    determine_worker_count(hardware, use_thread_cap, max_threads_if_capped)
}

fn determine_worker_count(hardware: Option<usize>, use_cap: bool, cap: u32) -> usize {
    let effective = match hardware {
        Some(hw) => hw.saturating_sub(HARDWARE_MARGIN).max(1),
        None => DEFAULT_WORKER_COUNT,
    };

    if use_cap {
        effective.min((cap as usize).max(1))
    } else {
        effective
    }
}

/// Filter all segments in parallel, writing outputs into `output_dir`.
///
/// Results come back sorted by chunk index. If any segment fails, the
/// remaining queued work still runs to completion, the pool is joined,
/// and the first failure is returned; a partial result set is never
/// handed to the caller.
pub fn filter_segments(
    segments: Vec<SegmentFile>,
    backend: &FilterBackend,
    workers: usize,
    output_dir: &Path,
) -> FilterResult<Vec<ProcessedSegment>> {
    let expected = segments.len();
    if expected == 0 {
        return Ok(Vec::new());
    }

    let workers = workers.clamp(1, expected);
    debug!("Filtering {} segments with {} workers", expected, workers);

    let (job_tx, job_rx) = mpsc::channel::<SegmentFile>();
    let (result_tx, result_rx) = mpsc::channel::<FilterResult<ProcessedSegment>>();
    let job_rx = Arc::new(Mutex::new(job_rx));

    let mut handles = Vec::with_capacity(workers);
    for worker_id in 0..workers {
        let job_rx = Arc::clone(&job_rx);
        let result_tx = result_tx.clone();
        let backend = backend.clone();
        let output_dir = output_dir.to_path_buf();

        let handle = thread::spawn(move || {
            // The in-process backend gets one model per worker, owned for
            // the worker's whole lifetime and dropped on exit.
            let mut model = match &backend {
                FilterBackend::InProcess(factory) => match factory.create() {
                    Ok(m) => Some(m),
                    Err(e) => {
                        let _ = result_tx.send(Err(e));
                        return;
                    }
                },
                FilterBackend::Command(_) => None,
            };

            loop {
                let job = {
                    let rx = job_rx.lock();
                    rx.recv()
                };

                let job = match job {
                    Ok(job) => job,
                    // Channel closed: no more work.
                    Err(_) => break,
                };

                let index = job.index;
                let result = match &backend {
                    FilterBackend::Command(cmd) => {
                        cmd.filter_file(&job.path, &output_dir)
                    }
                    FilterBackend::InProcess(_) => {
                        run_in_process(model.as_deref_mut(), &job, &output_dir)
                    }
                };

                let result = result
                    .map(|path| ProcessedSegment { index, path })
                    .map_err(|e| FilterError::Segment {
                        index,
                        source: Box::new(e),
                    });

                if result_tx.send(result).is_err() {
                    break;
                }
            }
        });
        handles.push((worker_id, handle));
    }

    // Close our copies so the channels hang up once work is done.
    drop(result_tx);
    for segment in segments {
        if job_tx.send(segment).is_err() {
            break;
        }
    }
    drop(job_tx);

    // Drain every result; a failure does not interrupt in-flight work.
    let mut processed = Vec::with_capacity(expected);
    let mut first_error = None;
    for result in result_rx {
        match result {
            Ok(segment) => {
                debug!("Filtered segment {}", segment.index);
                processed.push(segment);
            }
            Err(e) => {
                warn!("Filter failure: {}", e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    for (worker_id, handle) in handles {
        if handle.join().is_err() && first_error.is_none() {
            first_error = Some(FilterError::WorkerPanicked { worker_id });
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    processed.sort_by_key(|s| s.index);

    if processed.len() != expected {
        return Err(FilterError::SegmentCountMismatch {
            expected,
            actual: processed.len(),
        });
    }

    Ok(processed)
}

fn run_in_process(
    model: Option<&mut (dyn super::model::FilterModel + 'static)>,
    job: &SegmentFile,
    output_dir: &Path,
) -> FilterResult<PathBuf> {
    let model = match model {
        Some(m) => m,
        None => return Err(FilterError::ModelCreate("worker has no model".into())),
    };

    let output = match job.path.file_name() {
        Some(name) => output_dir.join(name),
        None => return Err(FilterError::MissingOutput(output_dir.to_path_buf())),
    };

    stream::filter_file(model, &job.path, &output)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::model::FilterModel;

    struct IdentityModel;

    impl FilterModel for IdentityModel {
        fn frame_length(&self) -> usize {
            4
        }

        fn process_frame(&mut self, input: &[f32]) -> FilterResult<Vec<f32>> {
            Ok(input.to_vec())
        }
    }

    struct IdentityFactory;

    impl ModelFactory for IdentityFactory {
        fn create(&self) -> FilterResult<Box<dyn FilterModel>> {
            Ok(Box::new(IdentityModel))
        }
    }

    struct CountingFactory {
        created: std::sync::atomic::AtomicUsize,
    }

    impl ModelFactory for CountingFactory {
        fn create(&self) -> FilterResult<Box<dyn FilterModel>> {
            self.created
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(Box::new(IdentityModel))
        }
    }

    struct BrokenFactory;

    impl ModelFactory for BrokenFactory {
        fn create(&self) -> FilterResult<Box<dyn FilterModel>> {
            Err(FilterError::ModelCreate("library unavailable".into()))
        }
    }

    struct RejectingModel;

    impl FilterModel for RejectingModel {
        fn frame_length(&self) -> usize {
            4
        }

        fn process_frame(&mut self, _input: &[f32]) -> FilterResult<Vec<f32>> {
            Err(FilterError::Frame("bad frame".into()))
        }
    }

    struct RejectingFactory;

    impl ModelFactory for RejectingFactory {
        fn create(&self) -> FilterResult<Box<dyn FilterModel>> {
            Ok(Box::new(RejectingModel))
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
        for s in [10i16, -10, 20, -20, 30] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        SegmentFile { index, path }
    }

    #[test]
    fn margin_leaves_headroom_but_never_zero_workers() {
        assert_eq!(determine_worker_count(Some(8), false, 0), 6);
        assert_eq!(determine_worker_count(Some(3), false, 0), 1);
        assert_eq!(determine_worker_count(Some(2), false, 0), 1);
        assert_eq!(determine_worker_count(Some(1), false, 0), 1);
    }

    #[test]
    fn unknown_hardware_falls_back_to_default() {
        assert_eq!(determine_worker_count(None, false, 0), DEFAULT_WORKER_COUNT);
    }

    #[test]
    fn cap_limits_but_cannot_raise_the_count() {
        assert_eq!(determine_worker_count(Some(16), true, 4), 4);
        assert_eq!(determine_worker_count(Some(4), true, 12), 2);
        // A zero cap still leaves one worker.
        assert_eq!(determine_worker_count(Some(16), true, 0), 1);
    }

    #[test]
    fn empty_segment_list_yields_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilterBackend::InProcess(Arc::new(IdentityFactory));
        let out = filter_segments(Vec::new(), &backend, 4, dir.path()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn segments_come_back_sorted_by_index() {
        let dir = tempfile::tempdir().unwrap();
        let in_dir = dir.path().join("chunks");
        let out_dir = dir.path().join("processed");
        std::fs::create_dir_all(&in_dir).unwrap();
        std::fs::create_dir_all(&out_dir).unwrap();

        // Submit out of order across multiple workers.
        let segments: Vec<_> = [3, 0, 2, 1]
            .iter()
            .map(|&i| write_segment(&in_dir, i))
            .collect();

        let backend = FilterBackend::InProcess(Arc::new(IdentityFactory));
        let processed = filter_segments(segments, &backend, 2, &out_dir).unwrap();

        assert_eq!(processed.len(), 4);
        for (i, segment) in processed.iter().enumerate() {
            assert_eq!(segment.index, i);
            assert!(segment.path.starts_with(&out_dir));
            assert!(segment.path.exists());
        }
    }

    #[test]
    fn each_worker_creates_exactly_one_model() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("processed");
        std::fs::create_dir_all(&out_dir).unwrap();
        let segments: Vec<_> = (0..6).map(|i| write_segment(dir.path(), i)).collect();

        let factory = Arc::new(CountingFactory {
            created: std::sync::atomic::AtomicUsize::new(0),
        });
        let backend = FilterBackend::InProcess(Arc::clone(&factory) as Arc<dyn ModelFactory>);
        filter_segments(segments, &backend, 3, &out_dir).unwrap();

        assert_eq!(factory.created.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[test]
    fn model_creation_failure_fails_the_pool() {
        let dir = tempfile::tempdir().unwrap();
        let segments = vec![write_segment(dir.path(), 0)];

        let backend = FilterBackend::InProcess(Arc::new(BrokenFactory));
        let err = filter_segments(segments, &backend, 2, dir.path()).unwrap_err();
        assert!(matches!(err, FilterError::ModelCreate(_)));
    }

    #[test]
    fn one_bad_segment_fails_the_whole_batch() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("processed");
        std::fs::create_dir_all(&out_dir).unwrap();
        let segments: Vec<_> = (0..3).map(|i| write_segment(dir.path(), i)).collect();

        let backend = FilterBackend::InProcess(Arc::new(RejectingFactory));
        let err = filter_segments(segments, &backend, 2, &out_dir).unwrap_err();
        assert!(matches!(err, FilterError::Segment { .. }));
    }
}
