//! Configuration schema types.
//!
//! This module defines the structure of all configuration sections.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// When a positive negotiation schedules marshaler work.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WarmupMode {
    /// Load off the request path after a positive readable/writeable check.
    #[default]
    Background,
    /// Never schedule; the first decode/encode loads the marshaler.
    Disabled,
}

impl FromStr for WarmupMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "background" => Ok(Self::Background),
            "disabled" => Ok(Self::Disabled),
            _ => Err("expected 'background' or 'disabled'".to_string()),
        }
    }
}

impl fmt::Display for WarmupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Background => "background",
            Self::Disabled => "disabled",
        })
    }
}

/// What a scheduled warm-up does with the cache.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NegotiationLoad {
    /// Load the marshaler only if it is not cached yet.
    #[default]
    Warm,
    /// Recompute the marshaler on every positive negotiation.
    Refresh,
}

impl FromStr for NegotiationLoad {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "warm" => Ok(Self::Warm),
            "refresh" => Ok(Self::Refresh),
            _ => Err("expected 'warm' or 'refresh'".to_string()),
        }
    }
}

impl fmt::Display for NegotiationLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warm => "warm",
            Self::Refresh => "refresh",
        })
    }
}

/// Provider configuration section.
///
/// # Example
///
/// ```
/// use hermes_config::{NegotiationLoad, ProviderConfig, WarmupMode};
///
/// let config = ProviderConfig {
///     warmup: WarmupMode::Background,
///     negotiation_load: NegotiationLoad::Refresh,
///     ..Default::default()
/// };
/// assert_eq!(config.warmup_thread_name, "hermes-warmup");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Whether negotiation schedules background loads.
    #[serde(default)]
    pub warmup: WarmupMode,

    /// What a scheduled load does.
    #[serde(default)]
    pub negotiation_load: NegotiationLoad,

    /// Thread name used when no async runtime is available to run warm-ups.
    #[serde(default = "default_warmup_thread_name")]
    pub warmup_thread_name: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            warmup: WarmupMode::default(),
            negotiation_load: NegotiationLoad::default(),
            warmup_thread_name: default_warmup_thread_name(),
        }
    }
}

fn default_warmup_thread_name() -> String {
    "hermes-warmup".to_string()
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Enable metrics collection.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Histogram bucket boundaries for load and payload durations, in seconds.
    #[serde(default = "default_duration_buckets")]
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_buckets: default_duration_buckets(),
        }
    }
}

fn default_duration_buckets() -> Vec<f64> {
    hermes_telemetry::MetricsConfig::default().duration_buckets
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (e.g., "info", "hermes_core=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,

    /// Include thread IDs in logs.
    #[serde(default)]
    pub thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
            thread_ids: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telemetry configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfigSection {
    /// Service name attached to logs and metrics.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TelemetryConfigSection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TelemetryConfigSection {
    /// Converts this section into the telemetry crate's runtime configuration.
    #[must_use]
    pub fn to_telemetry_config(&self) -> hermes_telemetry::TelemetryConfig {
        let logging = hermes_telemetry::LogConfig {
            enabled: self.logging.enabled,
            level: self.logging.level.clone(),
            json_format: self.logging.format == LogFormat::Json,
            span_events: self.logging.format == LogFormat::Pretty,
            file_line_info: self.logging.include_location,
            thread_ids: self.logging.thread_ids,
            include_target: true,
            service_name: self.service_name.clone(),
        };

        let metrics = hermes_telemetry::MetricsConfig {
            enabled: self.metrics.enabled,
            service_name: self.service_name.clone(),
            duration_buckets: self.metrics.duration_buckets.clone(),
        };

        hermes_telemetry::TelemetryConfig::builder()
            .service_name(&self.service_name)
            .logging(logging)
            .metrics(metrics)
            .build()
    }
}

fn default_service_name() -> String {
    "hermes".to_string()
}

fn default_true() -> bool {
    true
}
