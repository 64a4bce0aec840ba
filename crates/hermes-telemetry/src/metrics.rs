//! Prometheus metrics for Hermes.
//!
//! Hermes records through the `metrics` facade; without an installed recorder
//! every call is a no-op. [`init_metrics`] installs the Prometheus recorder
//! and registers descriptions. The host exposes [`render_metrics`] on
//! whatever endpoint it already serves.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `hermes_marshaler_cache_hits_total` | Counter | - | Lookups served from the cache |
//! | `hermes_marshaler_cache_misses_total` | Counter | - | Lookups that had to load or wait |
//! | `hermes_marshaler_loads_total` | Counter | `outcome` | Resolver invocations |
//! | `hermes_marshaler_load_duration_seconds` | Histogram | `kind` | Resolver latency |
//! | `hermes_negotiations_total` | Counter | `direction`, `accepted` | Readable/writeable checks |
//! | `hermes_payloads_total` | Counter | `direction`, `type_key`, `outcome` | Decoded/encoded payloads |
//! | `hermes_payload_duration_seconds` | Histogram | `direction`, `type_key` | Decode/encode latency |

use crate::error::TelemetryError;
use crate::TelemetryResult;
use hermes_core::TypeKey;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use std::sync::OnceLock;
use std::time::Duration;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metric names.
pub mod names {
    /// Cache hits.
    pub const CACHE_HITS: &str = "hermes_marshaler_cache_hits_total";
    /// Cache misses.
    pub const CACHE_MISSES: &str = "hermes_marshaler_cache_misses_total";
    /// Resolver invocations.
    pub const LOADS: &str = "hermes_marshaler_loads_total";
    /// Resolver latency.
    pub const LOAD_DURATION: &str = "hermes_marshaler_load_duration_seconds";
    /// Negotiation checks.
    pub const NEGOTIATIONS: &str = "hermes_negotiations_total";
    /// Decoded and encoded payloads.
    pub const PAYLOADS: &str = "hermes_payloads_total";
    /// Decode/encode latency.
    pub const PAYLOAD_DURATION: &str = "hermes_payload_duration_seconds";
}

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Service name for metric labels.
    pub service_name: String,

    /// Histogram buckets for load and payload durations.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: "hermes".to_string(),
            // 100us .. 1s; marshaling is fast, loads may be slow
            duration_buckets: vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ],
        }
    }
}

/// Direction of a payload through the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Request body → value.
    Decode,
    /// Value → response body.
    Encode,
}

impl Direction {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::Encode => "encode",
        }
    }
}

/// Builds a Prometheus recorder without installing it.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidConfig` if the bucket list is empty.
pub fn build_recorder(config: &MetricsConfig) -> TelemetryResult<PrometheusRecorder> {
    let mut builder = PrometheusBuilder::new().add_global_label("service", &config.service_name);

    for name in [names::LOAD_DURATION, names::PAYLOAD_DURATION] {
        builder = builder
            .set_buckets_for_metric(Matcher::Full(name.to_string()), &config.duration_buckets)
            .map_err(|e| TelemetryError::InvalidConfig(e.to_string()))?;
    }

    Ok(builder.build_recorder())
}

/// Installs the Prometheus recorder as the global `metrics` recorder.
///
/// # Errors
///
/// Returns `TelemetryError::MetricsInit` if a global recorder is already
/// installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let recorder = build_recorder(config)?;
    let handle = recorder.handle();

    metrics::set_global_recorder(recorder)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);

    register_metric_descriptions();

    Ok(())
}

/// Returns the global metrics handle if initialized.
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Renders metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

/// Registers descriptions for all Hermes metrics on the current recorder.
pub fn register_metric_descriptions() {
    describe_counter!(names::CACHE_HITS, "Marshaler lookups served from the cache");
    describe_counter!(
        names::CACHE_MISSES,
        "Marshaler lookups that had to load or wait for a load"
    );
    describe_counter!(names::LOADS, "Marshaler resolver invocations by outcome");
    describe_histogram!(
        names::LOAD_DURATION,
        "Marshaler resolver latency in seconds"
    );
    describe_counter!(
        names::NEGOTIATIONS,
        "Readable/writeable checks by direction and result"
    );
    describe_counter!(
        names::PAYLOADS,
        "Payloads decoded or encoded by type and outcome"
    );
    describe_histogram!(
        names::PAYLOAD_DURATION,
        "Payload decode/encode latency in seconds"
    );
}

/// Records a readable/writeable check.
pub fn record_negotiation(direction: Direction, accepted: bool) {
    counter!(
        names::NEGOTIATIONS,
        "direction" => direction.as_str(),
        "accepted" => if accepted { "true" } else { "false" }
    )
    .increment(1);
}

/// Records a decoded or encoded payload.
///
/// `outcome` is a short label such as `"ok"`, `"malformed"` or `"skipped"`.
pub fn record_payload(direction: Direction, type_key: &TypeKey, outcome: &'static str, duration: Duration) {
    counter!(
        names::PAYLOADS,
        "direction" => direction.as_str(),
        "type_key" => type_key.to_string(),
        "outcome" => outcome
    )
    .increment(1);

    histogram!(
        names::PAYLOAD_DURATION,
        "direction" => direction.as_str(),
        "type_key" => type_key.to_string()
    )
    .record(duration.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.service_name, "hermes");
        assert!(!config.duration_buckets.is_empty());
    }

    #[test]
    fn test_empty_buckets_rejected() {
        let config = MetricsConfig {
            duration_buckets: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            build_recorder(&config),
            Err(TelemetryError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_record_functions_dont_panic() {
        record_negotiation(Direction::Decode, true);
        record_payload(
            Direction::Encode,
            &TypeKey::new("orders.Order"),
            "ok",
            Duration::from_millis(1),
        );
    }

    #[test]
    fn test_recorded_metrics_render() {
        let recorder = build_recorder(&MetricsConfig::default()).unwrap();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            register_metric_descriptions();
            record_negotiation(Direction::Encode, false);
            record_payload(
                Direction::Decode,
                &TypeKey::new("orders.Order"),
                "malformed",
                Duration::from_micros(250),
            );
        });

        let rendered = handle.render();
        assert!(rendered.contains("hermes_negotiations_total"));
        assert!(rendered.contains("direction=\"encode\""));
        assert!(rendered.contains("type_key=\"orders.Order\""));
        assert!(rendered.contains("outcome=\"malformed\""));
        assert!(rendered.contains("service=\"hermes\""));
    }

    #[test]
    fn test_direction_labels() {
        assert_eq!(Direction::Decode.as_str(), "decode");
        assert_eq!(Direction::Encode.as_str(), "encode");
    }
}
