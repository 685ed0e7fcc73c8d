//! Logging utilities and structured logging support

use std::io::Write;

pub use log::{debug, error, info, trace, warn};

/// Logger settings
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Filter directives in `RUST_LOG` syntax; falls back to the environment, then `info`
    pub filter: Option<String>,
}

impl LoggingConfig {
    /// Use the given filter directives
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Initialize the logging system with defaults
pub fn init() {
    init_with(&LoggingConfig::default());
}

/// Initialize the logging system
///
/// Later calls are ignored once a logger is installed.
pub fn init_with(config: &LoggingConfig) {
    let mut builder = env_logger::Builder::new();
    match (&config.filter, std::env::var("RUST_LOG")) {
        (Some(filter), _) => {
            builder.parse_filters(filter);
        }
        (None, Ok(env)) => {
            builder.parse_filters(&env);
        }
        (None, Err(_)) => {
            builder.filter_level(log::LevelFilter::Info);
        }
    }
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{}][{:^9}]: {}",
            buf.timestamp_seconds(),
            record.level(),
            record.args()
        )
    });
    let _ = builder.try_init();
}
