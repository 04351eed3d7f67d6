//! FFmpeg invocations for extraction, merging, and remuxing.
//!
//! All audio moves through the pipeline as 48 kHz mono signed 16-bit PCM;
//! the constants here are the single source of truth for those parameters.
//! Chunk boundaries are serialized with fixed 6-decimal precision so
//! adjacent extractions never round apart into audible gaps or overlaps.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::command::{run_command_logged, CommandBuilder, CommandError};
use crate::chunking::ChunkSpan;
use crate::logging::RunLogger;

/// Sample rate for all intermediate and final audio.
pub const AUDIO_SAMPLE_RATE: u32 = 48_000;

/// Channel count for all intermediate and final audio.
pub const AUDIO_CHANNELS: u32 = 1;

/// PCM codec used for all intermediate and final audio.
pub const AUDIO_CODEC: &str = "pcm_s16le";

/// Errors from ffmpeg operations.
#[derive(Error, Debug)]
pub enum FfmpegError {
    #[error(transparent)]
    Command(#[from] CommandError),

    /// ffmpeg reported success but the expected file is missing or empty.
    #[error("ffmpeg produced no output at {0}")]
    NoOutput(PathBuf),

    /// No crossfade graph exists for this segment count.
    #[error("cannot build a crossfade graph for {segments} segments")]
    EmptyGraph { segments: usize },

    /// Filesystem error around an ffmpeg operation.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for ffmpeg operations.
pub type FfmpegResult<T> = Result<T, FfmpegError>;

/// Format a time value for ffmpeg with fixed 6-decimal precision.
pub fn format_seconds(secs: f64) -> String {
    format!("{:.6}", secs)
}

/// Extract the full audio track of a media file to PCM WAV.
pub fn extract_audio(
    ffmpeg: &str,
    input: &Path,
    output: &Path,
    logger: &RunLogger,
) -> FfmpegResult<()> {
    let builder = CommandBuilder::new(ffmpeg)
        .flag("-y")
        .flag_with_path("-i", input)
        .flag_with("-ar", AUDIO_SAMPLE_RATE.to_string())
        .flag_with("-ac", AUDIO_CHANNELS.to_string())
        .flag_with("-c:a", AUDIO_CODEC)
        .path_arg(output);

    run_command_logged(&builder, logger)?;
    verify_output(output)
}

/// Extract one planned chunk of an audio file into its own WAV segment.
///
/// The seek and duration are placed before `-i` and rendered with fixed
/// precision; the segment is re-encoded with the pipeline's fixed PCM
/// parameters so every chunk is an independent, self-contained file.
pub fn extract_segment(
    ffmpeg: &str,
    input: &Path,
    span: &ChunkSpan,
    chunk_path: &Path,
    logger: &RunLogger,
) -> FfmpegResult<()> {
    let builder = CommandBuilder::new(ffmpeg)
        .flag("-y")
        .flag_with("-ss", format_seconds(span.start_time))
        .flag_with("-t", format_seconds(span.duration))
        .flag_with_path("-i", input)
        .flag_with("-ar", AUDIO_SAMPLE_RATE.to_string())
        .flag_with("-ac", AUDIO_CHANNELS.to_string())
        .flag_with("-c:a", AUDIO_CODEC)
        .path_arg(chunk_path);

    run_command_logged(&builder, logger)?;
    verify_output(chunk_path)
}

/// Merge processed segments into one track using a crossfade filter graph.
///
/// `inputs` must be in chunk order; `graph` is the filter_complex built by
/// the merge module, labelling its final stream `[outa]`.
pub fn merge_with_crossfade(
    ffmpeg: &str,
    inputs: &[PathBuf],
    graph: &str,
    output: &Path,
    logger: &RunLogger,
) -> FfmpegResult<()> {
    let mut builder = CommandBuilder::new(ffmpeg).flag("-y");
    for input in inputs {
        builder = builder.flag_with_path("-i", input);
    }
    let builder = builder
        .flag_with("-filter_complex", graph)
        .flag_with("-map", "[outa]")
        .flag_with("-c:a", AUDIO_CODEC)
        .flag_with("-ar", AUDIO_SAMPLE_RATE.to_string())
        .path_arg(output);

    run_command_logged(&builder, logger)?;
    verify_output(output)
}

/// Remux a video with a replacement audio track.
///
/// Video is stream-copied; the isolated audio is encoded to AAC. `-shortest`
/// guards against trailing drift between the two streams.
pub fn remux_audio_video(
    ffmpeg: &str,
    video: &Path,
    audio: &Path,
    output: &Path,
    logger: &RunLogger,
) -> FfmpegResult<()> {
    let builder = CommandBuilder::new(ffmpeg)
        .flag("-y")
        .flag_with_path("-i", video)
        .flag_with_path("-i", audio)
        .flag_with("-c:v", "copy")
        .flag_with("-c:a", "aac")
        .flag_with("-map", "0:v:0")
        .flag_with("-map", "1:a:0")
        .flag("-shortest")
        .path_arg(output);

    run_command_logged(&builder, logger)?;
    verify_output(output)
}

/// Check that ffmpeg actually produced a non-empty file.
fn verify_output(path: &Path) -> FfmpegResult<()> {
    let ok = std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
    if !ok {
        return Err(FfmpegError::NoOutput(path.to_path_buf()));
    }
    Ok(())
}
