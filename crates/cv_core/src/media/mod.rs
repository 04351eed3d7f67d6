//! External tool integration (ffmpeg / ffprobe).
//!
//! Everything that shells out lives here: the structured command builder,
//! duration and stream probing, and the ffmpeg extraction/merge/remux
//! wrappers. Callers never concatenate command strings themselves.

pub mod command;
pub mod ffmpeg;
pub mod probe;

pub use command::{run_command, run_command_logged, CommandBuilder, CommandError};
pub use ffmpeg::{FfmpegError, AUDIO_CHANNELS, AUDIO_CODEC, AUDIO_SAMPLE_RATE};
pub use probe::{probe_duration, probe_media_kind, MediaKind, ProbeError};
