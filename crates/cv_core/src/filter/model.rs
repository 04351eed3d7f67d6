//! The model seam: what a suppression backend must provide.
//!
//! `FilterModel` is the in-process shape - a stateful handle that eats
//! fixed-size frames. `ModelFactory` exists because handles are not
//! shareable: every worker thread creates and exclusively owns its own
//! instance, and the instance is released when the worker drops it.
//! `DeepFilterCommand` is the subprocess alternative that wraps the
//! `deep-filter` executable and needs no in-process state at all.

use std::path::{Path, PathBuf};

use super::{FilterError, FilterResult};
use crate::media::command::{run_command, CommandBuilder};

/// A stateful suppression model processing audio frame by frame.
///
/// Implementations are owned by exactly one worker thread at a time and
/// release their resources on drop.
pub trait FilterModel: Send {
    /// Number of samples the model consumes per call.
    fn frame_length(&self) -> usize;

    /// Process one frame of exactly `frame_length()` samples, returning
    /// the filtered frame of the same length.
    fn process_frame(&mut self, input: &[f32]) -> FilterResult<Vec<f32>>;
}

/// Creates fresh model instances, one per worker.
pub trait ModelFactory: Send + Sync {
    fn create(&self) -> FilterResult<Box<dyn FilterModel>>;
}

/// Subprocess backend wrapping the `deep-filter` command-line tool.
///
/// One invocation filters one whole segment file; the tool writes its
/// output under `--output-dir` keeping the input's file name.
#[derive(Debug, Clone)]
pub struct DeepFilterCommand {
    executable: String,
    attenuation_limit: f64,
    compensate_delay: bool,
    post_filter: bool,
}

impl DeepFilterCommand {
    pub fn new(
        executable: impl Into<String>,
        attenuation_limit: f64,
        compensate_delay: bool,
        post_filter: bool,
    ) -> Self {
        Self {
            executable: executable.into(),
            attenuation_limit,
            compensate_delay,
            post_filter,
        }
    }

    /// Build the invocation for one segment file.
    fn command(&self, input: &Path, output_dir: &Path) -> CommandBuilder {
        let mut builder = CommandBuilder::new(&self.executable)
            .flag_with_path("--output-dir", output_dir)
            .flag_with("--atten-lim", self.attenuation_limit.to_string());

        if self.compensate_delay {
            builder = builder.flag("--compensate-delay");
        }
        if self.post_filter {
            builder = builder.flag("--pf");
        }

        builder.path_arg(input)
    }

    /// Filter one segment file, returning the path of the filtered copy.
    pub fn filter_file(&self, input: &Path, output_dir: &Path) -> FilterResult<PathBuf> {
        run_command(&self.command(input, output_dir))?;

        let output = match input.file_name() {
            Some(name) => output_dir.join(name),
            None => return Err(FilterError::MissingOutput(output_dir.to_path_buf())),
        };

        if !output.exists() {
            return Err(FilterError::MissingOutput(output));
        }

        Ok(output)
    }
}
