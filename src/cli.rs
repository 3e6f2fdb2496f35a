//! Logging options and error reporting shared by the binaries.

use std::io;

use clap::Args;
use tracing::{error, level_filters::LevelFilter, Level};
use tracing_subscriber::EnvFilter;

#[derive(Args, Debug, Clone, Copy)]
pub struct LogArgs {
    /// Logging level, overridden by RUST_LOG
    #[arg(short, long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl LogArgs {
    /// Install the global subscriber. Logs go to stderr so stdout only carries records.
    pub fn init(&self) {
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::from(Level::from(self.log_level)).into())
            .from_env_lossy();
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(io::stderr)
            .init();
    }
}

/// Log the full error chain and print it to stderr regardless of the log filter.
pub fn report(err: &anyhow::Error) {
    error!("{err:#}");
    eprintln!("error: {err:#}");
}
