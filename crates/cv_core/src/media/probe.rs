//! Media probing via ffprobe.
//!
//! Duration probing parses a single floating-point seconds value from
//! stdout. Stream probing classifies the input as audio or video from
//! ffprobe's JSON stream listing.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::command::{run_command, run_command_logged, CommandBuilder, CommandError};
use crate::logging::RunLogger;

/// Errors from probing a media file.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The input file does not exist.
    #[error("media file not found: {0}")]
    SourceNotFound(PathBuf),

    /// ffprobe could not be started or exited non-zero.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// ffprobe ran but its output was not a parseable duration.
    #[error("could not parse duration from ffprobe output: {0:?}")]
    UnparsableDuration(String),

    /// The probed duration is not usable for chunk planning.
    #[error("media duration must be positive, got {0}")]
    NonPositiveDuration(f64),

    /// ffprobe's stream listing was not valid JSON.
    #[error("could not parse ffprobe stream JSON: {0}")]
    StreamJson(#[from] serde_json::Error),
}

/// Result type for probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Broad classification of a media file by its streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// At least one real video stream (attached pictures excluded).
    Video,
    /// Audio streams only.
    Audio,
    /// Neither audio nor video streams found.
    Unsupported,
}

/// Get the duration of a media file in seconds.
///
/// Returns `NonPositiveDuration` for durations <= 0, which are a hard
/// failure for the whole pipeline.
pub fn probe_duration(ffprobe: &str, input_path: &Path, logger: &RunLogger) -> ProbeResult<f64> {
    if !input_path.exists() {
        return Err(ProbeError::SourceNotFound(input_path.to_path_buf()));
    }

    let builder = CommandBuilder::new(ffprobe)
        .flag_with("-v", "error")
        .flag_with("-show_entries", "format=duration")
        .flag_with("-of", "default=noprint_wrappers=1:nokey=1")
        .path_arg(input_path);

    let output = run_command_logged(&builder, logger)?;
    parse_duration_output(&output.stdout)
}

/// Parse ffprobe's duration stdout into validated seconds.
fn parse_duration_output(stdout: &str) -> ProbeResult<f64> {
    let trimmed = stdout.trim();
    let duration = trimmed
        .parse::<f64>()
        .map_err(|_| ProbeError::UnparsableDuration(trimmed.to_string()))?;

    if !duration.is_finite() || duration <= 0.0 {
        return Err(ProbeError::NonPositiveDuration(duration));
    }

    Ok(duration)
}

/// Classify a media file as audio, video, or unsupported.
pub fn probe_media_kind(ffprobe: &str, input_path: &Path) -> ProbeResult<MediaKind> {
    if !input_path.exists() {
        return Err(ProbeError::SourceNotFound(input_path.to_path_buf()));
    }

    let builder = CommandBuilder::new(ffprobe)
        .flag_with("-loglevel", "error")
        .flag_with("-show_entries", "stream")
        .flag_with("-of", "json")
        .path_arg(input_path);

    let output = run_command(&builder)?;
    let streams: StreamListing = serde_json::from_str(&output.stdout)?;

    Ok(classify_streams(&streams))
}

#[derive(Debug, Deserialize)]
struct StreamListing {
    #[serde(default)]
    streams: Vec<StreamInfo>,
}

#[derive(Debug, Deserialize)]
struct StreamInfo {
    codec_type: Option<String>,
    avg_frame_rate: Option<String>,
}

impl StreamInfo {
    /// A stream counts as video only with a real frame rate; cover art
    /// in audio files shows up as a video stream with rate `0/0`.
    fn is_actual_video(&self) -> bool {
        if self.codec_type.as_deref() != Some("video") {
            return false;
        }
        match self.avg_frame_rate.as_deref() {
            Some(rate) => rate != "0/0",
            None => false,
        }
    }

    fn is_audio(&self) -> bool {
        self.codec_type.as_deref() == Some("audio")
    }
}

fn classify_streams(listing: &StreamListing) -> MediaKind {
    let mut has_audio = false;
    for stream in &listing.streams {
        if stream.is_actual_video() {
            return MediaKind::Video;
        }
        if stream.is_audio() {
            has_audio = true;
        }
    }

    if has_audio {
        MediaKind::Audio
    } else {
        MediaKind::Unsupported
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_duration() {
        let duration = parse_duration_output("734.520000\n").unwrap();
        assert!((duration - 734.52).abs() < 1e-9);
    }

    #[test]
    fn rejects_unparsable_duration() {
        let err = parse_duration_output("N/A\n").unwrap_err();
        assert!(matches!(err, ProbeError::UnparsableDuration(_)));
    }

    #[test]
    fn rejects_empty_output() {
        let err = parse_duration_output("").unwrap_err();
        assert!(matches!(err, ProbeError::UnparsableDuration(_)));
    }

    #[test]
    fn rejects_non_positive_duration() {
        let err = parse_duration_output("0.0").unwrap_err();
        assert!(matches!(err, ProbeError::NonPositiveDuration(_)));

        let err = parse_duration_output("-3.5").unwrap_err();
        assert!(matches!(err, ProbeError::NonPositiveDuration(_)));
    }

    #[test]
    fn classifies_video_file() {
        let json = r#"{"streams":[
            {"codec_type":"video","avg_frame_rate":"24000/1001"},
            {"codec_type":"audio","avg_frame_rate":"0/0"}
        ]}"#;
        let listing: StreamListing = serde_json::from_str(json).unwrap();
        assert_eq!(classify_streams(&listing), MediaKind::Video);
    }

    #[test]
    fn cover_art_does_not_make_audio_a_video() {
        // MP3 with embedded cover art: a "video" stream with 0/0 rate.
        let json = r#"{"streams":[
            {"codec_type":"video","avg_frame_rate":"0/0"},
            {"codec_type":"audio","avg_frame_rate":"0/0"}
        ]}"#;
        let listing: StreamListing = serde_json::from_str(json).unwrap();
        assert_eq!(classify_streams(&listing), MediaKind::Audio);
    }

    #[test]
    fn no_streams_is_unsupported() {
        let listing: StreamListing = serde_json::from_str(r#"{"streams":[]}"#).unwrap();
        assert_eq!(classify_streams(&listing), MediaKind::Unsupported);
    }

    #[test]
    fn probe_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let logger = RunLogger::new(
            "probe",
            dir.path(),
            crate::logging::LogConfig::default(),
            None,
        )
        .unwrap();

        let err =
            probe_duration("ffprobe", Path::new("/nonexistent/file.mkv"), &logger).unwrap_err();
        assert!(matches!(err, ProbeError::SourceNotFound(_)));
    }
}
