//! Logging setup for the `fieldwire` binary.
//!
//! The target is itself a configuration value (`--log`, `LOG`), parsed from
//! `0`/`off`, `1`/`stdout`, `2`/`stderr` or a file name.

use anyhow::{Context as _, Result};
use std::convert::Infallible;
use std::fmt;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Where log output goes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogTarget {
    Off,
    Stdout,
    #[default]
    Stderr,
    /// Append to a file.
    File(PathBuf),
}

impl FromStr for LogTarget {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "0" | "off" => LogTarget::Off,
            "1" | "stdout" => LogTarget::Stdout,
            "2" | "stderr" => LogTarget::Stderr,
            filename => LogTarget::File(PathBuf::from(filename)),
        })
    }
}

impl fmt::Display for LogTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogTarget::Off => write!(f, "off"),
            LogTarget::Stdout => write!(f, "stdout"),
            LogTarget::Stderr => write!(f, "stderr"),
            LogTarget::File(path) => write!(f, "{}", path.display()),
        }
    }
}

crate::scalar_value!(LogTarget);

/// Install the global subscriber for `target`.
///
/// `RUST_LOG` refines the filter; without it the level is `DEBUG` when
/// `verbose` is set and `INFO` otherwise.
pub fn init(target: &LogTarget, verbose: bool) -> Result<()> {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

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
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
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
        assert_eq!("0".parse::<LogTarget>().unwrap(), LogTarget::Off);
        assert_eq!("off".parse::<LogTarget>().unwrap(), LogTarget::Off);
        assert_eq!("1".parse::<LogTarget>().unwrap(), LogTarget::Stdout);
        assert_eq!("stderr".parse::<LogTarget>().unwrap(), LogTarget::Stderr);
        assert_eq!(
            "/tmp/fieldwire.log".parse::<LogTarget>().unwrap(),
            LogTarget::File(PathBuf::from("/tmp/fieldwire.log"))
        );
    }

    #[test]
    fn test_display_roundtrip() {
        for target in [LogTarget::Off, LogTarget::Stdout, LogTarget::Stderr] {
            assert_eq!(target.to_string().parse::<LogTarget>().unwrap(), target);
        }
    }
}
