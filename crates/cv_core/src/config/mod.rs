//! Configuration management for ClearVoice.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Validation on load, before any external tool is spawned

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ChunkingSettings, ConfigSection, FilterSettings, LoggingSettings, PathSettings, Settings,
    ToolSettings, WorkerSettings,
};
