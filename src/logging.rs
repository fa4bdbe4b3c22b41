//! Logging setup for the binary.
//!
//! Output goes to stdout, stderr or an append-mode file, chosen by `--log`.
//! `<APP>_LOG` holds an `EnvFilter` directive that overrides `--verbose`.

use crate::config::env_prefix;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Off,
    Stdout,
    Stderr,
    File(String),
}

impl LogTarget {
    /// Parse a `--log` value: `0/off`, `1/stdout`, `2/stderr`, or a file name.
    pub fn parse(value: &str) -> Self {
        match value {
            "0" | "off" => LogTarget::Off,
            "1" | "stdout" => LogTarget::Stdout,
            "2" | "stderr" => LogTarget::Stderr,
            filename => LogTarget::File(filename.to_string()),
        }
    }
}

/// Filter from `<APP>_LOG`, else INFO (DEBUG when verbose).
pub fn filter_for(app: &str, verbose: bool) -> EnvFilter {
    let var = format!("{}_LOG", env_prefix(app));
    match std::env::var(&var) {
        Ok(directive) if !directive.is_empty() => EnvFilter::try_new(&directive)
            .unwrap_or_else(|_| EnvFilter::new(default_level(verbose).to_string())),
        _ => EnvFilter::new(default_level(verbose).to_string()),
    }
}

fn default_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    }
}

/// Install the global subscriber.
pub fn init(target: &LogTarget, app: &str, verbose: bool) -> Result<()> {
    let filter = filter_for(app, verbose);
    match target {
        LogTarget::Off => {}
        LogTarget::Stdout => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogTarget::Stderr => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogTarget::File(filename) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)
                .with_context(|| format!("Failed to open log file {filename}"))?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_target() {
        assert_eq!(LogTarget::parse("0"), LogTarget::Off);
        assert_eq!(LogTarget::parse("stdout"), LogTarget::Stdout);
        assert_eq!(LogTarget::parse("2"), LogTarget::Stderr);
        assert_eq!(
            LogTarget::parse("teamcfg.log"),
            LogTarget::File("teamcfg.log".to_string())
        );
    }
}
