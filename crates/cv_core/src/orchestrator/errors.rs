//! Error types for the orchestrator pipeline.
//!
//! Errors carry context that chains through layers:
//! Run → Step → Operation → Detail

use std::io;

use thiserror::Error;

use crate::filter::FilterError;
use crate::media::ffmpeg::FfmpegError;
use crate::media::probe::ProbeError;

/// Top-level pipeline error with run context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed during execution.
    #[error("Run '{run_name}' failed at step '{step_name}': {source}")]
    StepFailed {
        run_name: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// Input validation failed before the pipeline started.
    #[error("Run '{run_name}' failed validation: {message}")]
    ValidationFailed { run_name: String, message: String },

    /// Failed to set up the run (create directories, etc.).
    #[error("Run '{run_name}' setup failed: {message}")]
    SetupFailed { run_name: String, message: String },

    /// The input has neither a usable audio nor video stream.
    #[error("Run '{run_name}' rejected: {message}")]
    UnsupportedMedia { run_name: String, message: String },
}

impl PipelineError {
    /// Create a step failed error.
    pub fn step_failed(
        run_name: impl Into<String>,
        step_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            run_name: run_name.into(),
            step_name: step_name.into(),
            source,
        }
    }

    /// Create a validation failed error.
    pub fn validation_failed(run_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            run_name: run_name.into(),
            message: message.into(),
        }
    }

    /// Create a setup failed error.
    pub fn setup_failed(run_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            run_name: run_name.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported media error.
    pub fn unsupported_media(run_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnsupportedMedia {
            run_name: run_name.into(),
            message: message.into(),
        }
    }
}

/// Error from a pipeline step with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// Probing the media failed.
    #[error("Probe failed: {0}")]
    Probe(#[from] ProbeError),

    /// Audio or segment extraction failed.
    #[error("Extraction failed{}: {source}", chunk_suffix(.chunk))]
    Extraction {
        /// Index of the failing chunk, when the failure is per-chunk.
        chunk: Option<usize>,
        #[source]
        source: FfmpegError,
    },

    /// The filter stage failed.
    #[error("Filter failed: {0}")]
    Filter(#[from] FilterError),

    /// Reassembling the filtered segments failed.
    #[error("Merge failed: {0}")]
    Merge(#[source] FfmpegError),

    /// Remuxing the isolated audio back into the video failed.
    #[error("Remux failed: {0}")]
    Remux(#[source] FfmpegError),

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// A required file was not found.
    #[error("Required file not found: {path}")]
    FileNotFound { path: String },

    /// A precondition was not met.
    #[error("Precondition not met: {0}")]
    PreconditionFailed(String),
}

fn chunk_suffix(chunk: &Option<usize>) -> String {
    match chunk {
        Some(i) => format!(" for chunk {i}"),
        None => String::new(),
    }
}

impl StepError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an invalid output error.
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    /// Create an extraction error for the whole track.
    pub fn extraction(source: FfmpegError) -> Self {
        Self::Extraction {
            chunk: None,
            source,
        }
    }

    /// Create an extraction error for one chunk.
    pub fn chunk_extraction(chunk: usize, source: FfmpegError) -> Self {
        Self::Extraction {
            chunk: Some(chunk),
            source,
        }
    }

    /// Create an I/O error with context.
    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            operation: operation.into(),
            source,
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a precondition failed error.
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
