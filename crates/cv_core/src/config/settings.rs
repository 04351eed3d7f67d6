//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level
//! updates. All numeric bounds are enforced by `Settings::validate()`
//! before any external tool is spawned.

use serde::{Deserialize, Serialize};

use super::manager::{ConfigError, ConfigResult};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// External tool locations.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Suppression filter settings.
    #[serde(default)]
    pub filter: FilterSettings,

    /// Chunk planning settings.
    #[serde(default)]
    pub chunking: ChunkingSettings,

    /// Worker pool settings.
    #[serde(default)]
    pub workers: WorkerSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Validate all sections, rejecting values no pipeline run can use.
    pub fn validate(&self) -> ConfigResult<()> {
        let atten = self.filter.attenuation_limit;
        if !atten.is_finite() || !(0.0..=100.0).contains(&atten) {
            return Err(ConfigError::Invalid(format!(
                "filter.attenuation_limit must be between 0 and 100, got {atten}"
            )));
        }

        if self.chunking.chunk_count < 1 {
            return Err(ConfigError::Invalid(
                "chunking.chunk_count must be at least 1".to_string(),
            ));
        }

        let overlap = self.chunking.overlap_duration;
        if !overlap.is_finite() || overlap < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "chunking.overlap_duration must be non-negative, got {overlap}"
            )));
        }

        if self.workers.use_thread_cap && self.workers.max_threads_if_capped < 1 {
            return Err(ConfigError::Invalid(
                "workers.max_threads_if_capped must be at least 1 when the cap is enabled"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

/// Path configuration for output, temp, and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Output folder for isolated audio and remuxed video.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Root folder for scratch chunk files.
    #[serde(default = "default_temp_root")]
    pub temp_root: String,

    /// Folder for per-run log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_output_folder() -> String {
    "isolated_output".to_string()
}

fn default_temp_root() -> String {
    ".temp".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
            temp_root: default_temp_root(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// External tool locations.
///
/// Bare names resolve through PATH; absolute paths pin a specific build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// ffmpeg executable.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    /// ffprobe executable.
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
        }
    }
}

/// Suppression filter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSettings {
    /// Path or name of the `deep-filter` executable.
    #[serde(default = "default_deep_filter_path")]
    pub deep_filter_path: String,

    /// Attenuation limit in dB, 0 to 100. 100 removes non-speech fully.
    #[serde(default = "default_attenuation_limit")]
    pub attenuation_limit: f64,

    /// Compensate for the model's processing delay.
    #[serde(default = "default_true")]
    pub compensate_delay: bool,

    /// Enable the model's extra post-filter pass.
    #[serde(default)]
    pub post_filter: bool,
}

fn default_deep_filter_path() -> String {
    "deep-filter".to_string()
}

fn default_attenuation_limit() -> f64 {
    100.0
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            deep_filter_path: default_deep_filter_path(),
            attenuation_limit: default_attenuation_limit(),
            compensate_delay: true,
            post_filter: false,
        }
    }
}

/// Chunk planning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingSettings {
    /// Number of chunks the track is split into.
    #[serde(default = "default_chunk_count")]
    pub chunk_count: u32,

    /// Seconds of audio shared between adjacent chunks.
    #[serde(default = "default_overlap_duration")]
    pub overlap_duration: f64,
}

fn default_chunk_count() -> u32 {
    6
}

fn default_overlap_duration() -> f64 {
    0.5
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_count: default_chunk_count(),
            overlap_duration: default_overlap_duration(),
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Cap the worker count below what the hardware allows.
    #[serde(default)]
    pub use_thread_cap: bool,

    /// Maximum workers when the cap is enabled.
    #[serde(default = "default_max_threads")]
    pub max_threads_if_capped: u32,
}

fn default_max_threads() -> u32 {
    6
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            use_thread_cap: false,
            max_threads_if_capped: default_max_threads(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Use compact log format.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of error lines to keep in the tail buffer.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Prefix log lines with a HH:MM:SS timestamp.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

fn default_true() -> bool {
    true
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            show_timestamps: true,
        }
    }
}

/// Identifies a config section for section-level updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Paths,
    Tools,
    Filter,
    Chunking,
    Workers,
    Logging,
}

impl ConfigSection {
    /// The TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Tools => "tools",
            ConfigSection::Filter => "filter",
            ConfigSection::Chunking => "chunking",
            ConfigSection::Workers => "workers",
            ConfigSection::Logging => "logging",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        Settings::default().validate().unwrap();
    }

    #[test]
    fn attenuation_limit_is_bounded() {
        let mut settings = Settings::default();
        settings.filter.attenuation_limit = 150.0;
        assert!(settings.validate().is_err());

        settings.filter.attenuation_limit = -1.0;
        assert!(settings.validate().is_err());

        settings.filter.attenuation_limit = 0.0;
        settings.validate().unwrap();
        settings.filter.attenuation_limit = 100.0;
        settings.validate().unwrap();
    }

    #[test]
    fn chunk_count_must_be_positive() {
        let mut settings = Settings::default();
        settings.chunking.chunk_count = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn overlap_must_be_non_negative_and_finite() {
        let mut settings = Settings::default();
        settings.chunking.overlap_duration = -0.5;
        assert!(settings.validate().is_err());

        settings.chunking.overlap_duration = f64::NAN;
        assert!(settings.validate().is_err());

        settings.chunking.overlap_duration = 0.0;
        settings.validate().unwrap();
    }

    #[test]
    fn enabled_cap_requires_at_least_one_thread() {
        let mut settings = Settings::default();
        settings.workers.use_thread_cap = true;
        settings.workers.max_threads_if_capped = 0;
        assert!(settings.validate().is_err());

        settings.workers.max_threads_if_capped = 1;
        settings.validate().unwrap();
    }

    #[test]
    fn missing_sections_deserialize_to_defaults() {
        let settings: Settings = toml::from_str("[filter]\nattenuation_limit = 85.0\n").unwrap();
        assert_eq!(settings.filter.attenuation_limit, 85.0);
        assert_eq!(settings.chunking.chunk_count, 6);
        assert_eq!(settings.chunking.overlap_duration, 0.5);
        assert_eq!(settings.paths.output_folder, "isolated_output");
    }
}
