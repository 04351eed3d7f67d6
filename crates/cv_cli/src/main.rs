mod cli;

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use cv_core::config::ConfigManager;
use cv_core::logging::{init_tracing, LogCallback, LogLevel};
use cv_core::Engine;

use crate::cli::build_cli;

fn main() -> anyhow::Result<()> {
    let matches = build_cli().get_matches();

    let level = if matches.get_flag("verbose") {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    init_tracing(level);

    let input_path = matches
        .get_one::<PathBuf>("file_path")
        .expect("required argument");
    if !input_path.is_file() {
        return Err(anyhow!(
            "input file does not exist: {}",
            input_path.display()
        ));
    }

    let config_path = matches
        .get_one::<PathBuf>("config")
        .expect("defaulted argument");
    let mut config = ConfigManager::new(config_path);
    config
        .load_or_create()
        .with_context(|| format!("failed to load config '{}'", config_path.display()))?;

    // Command-line overrides are applied in memory only; the config file
    // keeps what the user wrote.
    let settings = config.settings_mut();
    if let Some(output) = matches.get_one::<PathBuf>("output") {
        settings.paths.output_folder = output.display().to_string();
    }
    if let Some(limit) = matches.get_one::<f64>("attenuation") {
        settings.filter.attenuation_limit = *limit;
    }
    if let Some(count) = matches.get_one::<u32>("chunks") {
        settings.chunking.chunk_count = *count;
    }
    if let Some(overlap) = matches.get_one::<f64>("overlap") {
        settings.chunking.overlap_duration = *overlap;
    }
    if let Some(threads) = matches.get_one::<u32>("threads") {
        settings.workers.use_thread_cap = true;
        settings.workers.max_threads_if_capped = *threads;
    }
    settings.validate().context("invalid configuration")?;

    config
        .ensure_dirs_exist()
        .context("failed to create configured directories")?;

    let console: LogCallback = Box::new(|line| println!("{line}"));
    let engine = Engine::new(config.settings().clone())
        .with_keep_scratch(matches.get_flag("keep-scratch"))
        .with_log_callback(console);

    let output = engine
        .isolate(input_path)
        .with_context(|| format!("isolation failed for '{}'", input_path.display()))?;

    println!("Isolated audio: {}", output.audio_path.display());
    if let Some(video) = &output.video_path {
        println!("Processed video: {}", video.display());
    }
    println!("Run log: {}", output.log_path.display());

    Ok(())
}
