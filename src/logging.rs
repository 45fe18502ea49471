//! Logging setup for the registry's trace events.
//!
//! Every declare/resolve/remove emits a `tracing` event with
//! `target: "bindery"`. This module wires up a subscriber for those events;
//! it is only needed by binaries that do not install their own.
//!
//! # Features
//!
//! - `logging` - emit events (default)
//! - `logging-json` - JSON subscriber output (production)
//! - `logging-pretty` - colorful subscriber output (development)
//!
//! # Example
//!
//! ```rust,ignore
//! use bindery::logging;
//!
//! // Default setup: JSON if logging-json is enabled, pretty otherwise.
//! logging::init();
//!
//! // Or configure explicitly.
//! logging::builder()
//!     .with_level(tracing::Level::TRACE)
//!     .registry_only()
//!     .pretty()
//!     .init();
//! ```

#[cfg(feature = "logging")]
use tracing::Level;

/// Subscriber output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON structured output (production default).
    #[default]
    Json,
    /// Pretty colorful output (development).
    Pretty,
    /// Compact single-line output.
    Compact,
}

/// Builder for subscriber configuration.
#[cfg(feature = "logging")]
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
}

#[cfg(feature = "logging")]
impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Json,
            target: None,
        }
    }
}

#[cfg(feature = "logging")]
impl LoggingBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum log level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Only show events from a specific target.
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    /// Only show this crate's registry events.
    pub fn registry_only(self) -> Self {
        self.with_target_filter("bindery")
    }

    /// Use JSON output.
    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    /// Use pretty colorful output.
    pub fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    /// Use compact single-line output.
    pub fn compact(mut self) -> Self {
        self.format = LogFormat::Compact;
        self
    }

    /// Install the subscriber with the configured settings.
    ///
    /// Requires the `logging-json` or `logging-pretty` feature.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn init(self) {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = if let Some(target) = self.target {
            EnvFilter::new(format!("{}={}", target, self.level))
        } else {
            EnvFilter::new(self.level.to_string())
        };

        match self.format {
            LogFormat::Json => {
                #[cfg(feature = "logging-json")]
                {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().json().with_target(true))
                        .init();
                }
                #[cfg(not(feature = "logging-json"))]
                {
                    // JSON output not compiled in; fall back to the default layer.
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().with_target(true))
                        .init();
                }
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty().with_target(true))
                    .init();
            }
            LogFormat::Compact => {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact().with_target(true))
                    .init();
            }
        }
    }

    /// Install the subscriber (no-op without a subscriber feature).
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn init(self) {}
}

/// Create a new logging builder.
#[cfg(feature = "logging")]
pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Install a subscriber with default settings: JSON if `logging-json` is
/// enabled, pretty otherwise.
#[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
pub fn init() {
    #[cfg(feature = "logging-json")]
    {
        init_json();
    }
    #[cfg(all(feature = "logging-pretty", not(feature = "logging-json")))]
    {
        init_pretty();
    }
}

/// Install a subscriber (no-op without a subscriber feature).
#[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
pub fn init() {}

/// Install a JSON subscriber at DEBUG level.
#[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
pub fn init_json() {
    builder().json().init();
}

/// Install a JSON subscriber (no-op without a subscriber feature).
#[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
pub fn init_json() {}

/// Install a pretty subscriber at DEBUG level.
#[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
pub fn init_pretty() {
    builder().pretty().init();
}

/// Install a pretty subscriber (no-op without a subscriber feature).
#[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
pub fn init_pretty() {}

/// Install a subscriber filtered to this crate's events only.
#[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
pub fn init_registry_only() {
    builder().registry_only().init();
}

/// Install a registry-only subscriber (no-op without a subscriber feature).
#[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
pub fn init_registry_only() {}
