use std::{fs::OpenOptions, path::PathBuf};

use tracing_subscriber::{filter::{LevelFilter, Targets}, prelude::*};

use crate::prelude::*;


#[derive(Debug, confique::Config)]
pub struct LogConfig {
    /// Minimum level of log messages from this tool to emit. Valid values:
    /// "off", "error", "warn", "info", "debug", "trace". Logs from
    /// dependencies (e.g. the HTTP library) are capped at "warn".
    #[config(default = "info")]
    pub level: String,

    /// If this is set, log messages are also written to this file.
    pub file: Option<PathBuf>,

    /// If this is set to `false`, log messages are not written to stdout.
    #[config(default = true)]
    pub stdout: bool,
}

pub fn init(config: &LogConfig) -> Result<()> {
    let level = parse_level_filter(&config.level)
        .map_err(|e| anyhow!("invalid 'log.level': {e}"))?;
    let filter = Targets::new()
        .with_default(LevelFilter::WARN)
        .with_target(env!("CARGO_CRATE_NAME"), level);

    let stdout_output = if config.stdout {
        Some(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
    } else {
        None
    };

    let file_output = if let Some(path) = &config.file {
        use std::io::Write;

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .with_context(|| format!("failed to open/create log file '{}'", path.display()))?;

        // Empty line separator to make process restarts easier to spot.
        file.write_all(b"\n\n").context("could not write to log file")?;

        Some(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_output)
        .with(stdout_output)
        .init();

    Ok(())
}

fn parse_level_filter(s: &str) -> Result<LevelFilter, String> {
    match s {
        "off" => Ok(LevelFilter::OFF),
        "trace" => Ok(LevelFilter::TRACE),
        "debug" => Ok(LevelFilter::DEBUG),
        "info" => Ok(LevelFilter::INFO),
        "warn" => Ok(LevelFilter::WARN),
        "error" => Ok(LevelFilter::ERROR),
        other => Err(format!("invalid log level '{other}'")),
    }
}
