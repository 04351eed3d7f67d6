use std::path::PathBuf;

use clap::{builder::ValueParser, value_parser, Arg, ArgAction, Command};

pub const DEFAULT_CONFIG_PATH: &str = "clearvoice.toml";

/// Parse an attenuation limit, bounded to what the filter accepts.
pub fn parse_attenuation(value: &str) -> Result<f64, String> {
    let limit: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid attenuation '{value}'"))?;
    if !limit.is_finite() || !(0.0..=100.0).contains(&limit) {
        return Err(format!(
            "attenuation must be between 0 and 100, got {limit}"
        ));
    }
    Ok(limit)
}

/// Parse a chunk count, at least one.
pub fn parse_chunk_count(value: &str) -> Result<u32, String> {
    let count: u32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid chunk count '{value}'"))?;
    if count < 1 {
        return Err("chunk count must be at least 1".into());
    }
    Ok(count)
}

/// Parse an overlap duration in seconds, non-negative.
pub fn parse_overlap(value: &str) -> Result<f64, String> {
    let overlap: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid overlap '{value}'"))?;
    if !overlap.is_finite() || overlap < 0.0 {
        return Err(format!("overlap must be non-negative, got {overlap}"));
    }
    Ok(overlap)
}

pub fn build_cli() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .bin_name("clearvoice")
        .about("Isolate speech from media files")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("CONFIG_FILE")
                .help("Path to the TOML configuration file")
                .default_value(DEFAULT_CONFIG_PATH)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT_DIR")
                .help("Directory where results are written (overrides config)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("attenuation")
                .short('a')
                .long("attenuation")
                .value_name("LIMIT")
                .help("Attenuation limit in dB, 0-100 (overrides config)")
                .value_parser(ValueParser::new(parse_attenuation)),
        )
        .arg(
            Arg::new("chunks")
                .long("chunks")
                .value_name("COUNT")
                .help("Number of chunks to split the track into (overrides config)")
                .value_parser(ValueParser::new(parse_chunk_count)),
        )
        .arg(
            Arg::new("overlap")
                .long("overlap")
                .value_name("SECONDS")
                .help("Overlap between adjacent chunks in seconds (overrides config)")
                .value_parser(ValueParser::new(parse_overlap)),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .value_name("COUNT")
                .help("Cap the number of filter workers")
                .value_parser(value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new("keep-scratch")
                .long("keep-scratch")
                .help("Keep the per-run scratch directories after finishing")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("file_path")
                .value_name("FILE_PATH")
                .help("Path to the input media file")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
}
