//! Parallel noise/music suppression of extracted audio segments.
//!
//! The filter stage takes the per-chunk WAV files produced by extraction
//! and runs each through a suppression model, several at a time. Two
//! backends exist: shelling out to the `deep-filter` executable per
//! segment, or streaming frames through an in-process model handle. Both
//! sit behind the same worker pool.

pub mod model;
pub mod pool;
pub mod stream;

use std::path::PathBuf;

use thiserror::Error;

use crate::media::command::CommandError;

pub use model::{DeepFilterCommand, FilterModel, ModelFactory};
pub use pool::{
    filter_segments, worker_count, FilterBackend, ProcessedSegment, SegmentFile,
};
pub use stream::filter_file;

/// Errors from the filter stage.
#[derive(Error, Debug)]
pub enum FilterError {
    /// A worker could not obtain a model instance.
    #[error("failed to create filter model: {0}")]
    ModelCreate(String),

    /// The external filter executable could not be run.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Reading or writing segment WAV data failed.
    #[error("WAV I/O error: {0}")]
    Wav(#[from] hound::Error),

    /// The model rejected a frame.
    #[error("filter model error: {0}")]
    Frame(String),

    /// The filter ran but the expected output file is missing.
    #[error("filter produced no output at {0}")]
    MissingOutput(PathBuf),

    /// A specific segment failed; the index ties the error back to its
    /// position in the chunk plan.
    #[error("segment {index} failed: {source}")]
    Segment {
        index: usize,
        #[source]
        source: Box<FilterError>,
    },

    /// A worker thread panicked instead of reporting a result.
    #[error("filter worker {worker_id} panicked")]
    WorkerPanicked { worker_id: usize },

    /// Fewer processed segments came back than went in.
    #[error("expected {expected} processed segments, got {actual}")]
    SegmentCountMismatch { expected: usize, actual: usize },
}

/// Result type for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;
