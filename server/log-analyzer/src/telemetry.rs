//! Tracing subscriber setup.

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Server logging to stdout. `RUST_LOG` wins over the configured level.
pub fn init(cfg: &LoggingConfig) {
  install(cfg, std::io::stdout, true);
}

/// Logs to stderr so stdout stays a clean JSON channel for the one-shot CLI.
pub fn init_stderr(cfg: &LoggingConfig) {
  install(cfg, std::io::stderr, false);
}

fn install<W>(cfg: &LoggingConfig, writer: W, ansi: bool)
where
  W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));

  match cfg.format {
    LogFormat::Json => {
      let layer = fmt::layer()
        .json()
        .with_target(true)
        .with_current_span(true)
        .with_writer(writer);
      tracing_subscriber::registry().with(filter).with(layer).init();
    }
    LogFormat::Pretty => {
      let layer = fmt::layer().with_target(true).with_ansi(ansi).with_writer(writer);
      tracing_subscriber::registry().with(filter).with(layer).init();
    }
  }
}
