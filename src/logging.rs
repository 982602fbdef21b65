//! Tracing subscriber setup shared by the binaries
//!
//! `RUST_LOG` wins over the configured level when set.

use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, for development
    Pretty,
    /// One JSON object per line, for production
    Json,
}

impl LogFormat {
    /// Parse the configured format; anything unrecognized is pretty
    pub fn from_config(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber
pub fn init_logging(config: &LoggingConfig) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", config.level)));

    let format = LogFormat::from_config(&config.format);
    let layer: BoxedLayer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let writer = Mutex::new(file);
            match format {
                LogFormat::Json => Box::new(fmt::layer().json().with_writer(writer)),
                LogFormat::Pretty => Box::new(fmt::layer().with_ansi(false).with_writer(writer)),
            }
        }
        None => match format {
            LogFormat::Json => Box::new(fmt::layer().json()),
            LogFormat::Pretty => Box::new(fmt::layer()),
        },
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(std::io::Error::other)
}
