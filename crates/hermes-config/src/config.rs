//! Main configuration types.
//!
//! This module provides the top-level [`HermesConfig`] struct and its builder.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, LogFormat, ProviderConfig, TelemetryConfigSection, WarmupMode};

/// Complete Hermes configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use hermes_config::{HermesConfig, WarmupMode};
///
/// let config = HermesConfig::default();
/// assert_eq!(config.provider.warmup, WarmupMode::Background);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct HermesConfig {
    /// Marshaling provider configuration.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Telemetry configuration (metrics, logging).
    #[serde(default)]
    pub telemetry: TelemetryConfigSection,
}

impl HermesConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> HermesConfigBuilder {
        HermesConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The log filter directive does not parse
    /// - The service name is empty
    /// - Duration buckets are empty, non-finite or not strictly ascending
    /// - Background warm-up is enabled with an empty thread name
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telemetry.service_name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "telemetry.service_name",
                "must not be empty",
            ));
        }

        if self.telemetry.logging.enabled {
            hermes_telemetry::logging::create_env_filter(&self.telemetry.logging.level).map_err(
                |e| ConfigError::invalid_value("telemetry.logging.level", e.to_string()),
            )?;
        }

        let buckets = &self.telemetry.metrics.duration_buckets;
        if self.telemetry.metrics.enabled {
            if buckets.is_empty() {
                return Err(ConfigError::invalid_value(
                    "telemetry.metrics.duration_buckets",
                    "must not be empty",
                ));
            }
            if buckets.iter().any(|b| !b.is_finite() || *b <= 0.0) {
                return Err(ConfigError::invalid_value(
                    "telemetry.metrics.duration_buckets",
                    "must be finite and positive",
                ));
            }
            if buckets.windows(2).any(|pair| pair[0] >= pair[1]) {
                return Err(ConfigError::invalid_value(
                    "telemetry.metrics.duration_buckets",
                    "must be strictly ascending",
                ));
            }
        }

        if self.provider.warmup == WarmupMode::Background
            && self.provider.warmup_thread_name.trim().is_empty()
        {
            return Err(ConfigError::validation_error(
                "provider.warmup_thread_name must be set when provider.warmup is 'background'",
            ));
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// - Pretty log formatting with source locations
    /// - Debug log level for the Hermes crates
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_config::HermesConfig;
    ///
    /// let config = HermesConfig::development();
    /// assert_eq!(config.telemetry.logging.format, hermes_config::LogFormat::Pretty);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.telemetry.logging.level = "hermes_core=debug,hermes_provider=debug,info".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config.telemetry.logging.include_location = true;
        config.telemetry.logging.thread_ids = true;

        config
    }

    /// Create a production configuration preset.
    ///
    /// - JSON log formatting
    /// - Info log level
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_config::HermesConfig;
    ///
    /// let config = HermesConfig::production();
    /// assert_eq!(config.telemetry.logging.format, hermes_config::LogFormat::Json);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.telemetry.logging.level = "info".to_string();
        config.telemetry.logging.format = LogFormat::Json;
        config.telemetry.logging.include_location = false;

        config
    }
}

/// Builder for [`HermesConfig`].
#[derive(Debug, Default)]
pub struct HermesConfigBuilder {
    provider: Option<ProviderConfig>,
    telemetry: Option<TelemetryConfigSection>,
}

impl HermesConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider configuration.
    #[must_use]
    pub fn provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the telemetry configuration.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetryConfigSection) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Build the configuration.
    ///
    /// Any unset sections will use their default values.
    #[must_use]
    pub fn build(self) -> HermesConfig {
        HermesConfig {
            provider: self.provider.unwrap_or_default(),
            telemetry: self.telemetry.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<HermesConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LoggingConfig, MetricsConfig, NegotiationLoad};

    #[test]
    fn test_default_config() {
        let config = HermesConfig::default();
        assert_eq!(config.provider.warmup, WarmupMode::Background);
        assert_eq!(config.provider.negotiation_load, NegotiationLoad::Warm);
        assert_eq!(config.telemetry.service_name, "hermes");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_sections() {
        let config = HermesConfig::builder()
            .provider(ProviderConfig {
                negotiation_load: NegotiationLoad::Refresh,
                ..Default::default()
            })
            .build();

        assert_eq!(config.provider.negotiation_load, NegotiationLoad::Refresh);
        // Other sections use defaults
        assert_eq!(config.telemetry.service_name, "hermes");
    }

    #[test]
    fn test_validate_bad_log_level() {
        let config = HermesConfig::builder()
            .telemetry(TelemetryConfigSection {
                logging: LoggingConfig {
                    level: "hermes_core=loudest".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            })
            .build();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("telemetry.logging.level"));
    }

    #[test]
    fn test_validate_bad_level_ignored_when_logging_disabled() {
        let config = HermesConfig::builder()
            .telemetry(TelemetryConfigSection {
                logging: LoggingConfig {
                    enabled: false,
                    level: "hermes_core=loudest".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            })
            .build();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_buckets() {
        let with_buckets = |buckets: Vec<f64>| {
            HermesConfig::builder()
                .telemetry(TelemetryConfigSection {
                    metrics: MetricsConfig {
                        enabled: true,
                        duration_buckets: buckets,
                    },
                    ..Default::default()
                })
                .build()
        };

        assert!(with_buckets(vec![0.001, 0.01, 0.1]).validate().is_ok());
        assert!(with_buckets(vec![]).validate().is_err());
        assert!(with_buckets(vec![0.1, 0.01]).validate().is_err());
        assert!(with_buckets(vec![0.1, 0.1]).validate().is_err());
        assert!(with_buckets(vec![f64::NAN]).validate().is_err());
        assert!(with_buckets(vec![-1.0, 1.0]).validate().is_err());
    }

    #[test]
    fn test_validate_empty_service_name() {
        let config = HermesConfig::builder()
            .telemetry(TelemetryConfigSection {
                service_name: "  ".to_string(),
                ..Default::default()
            })
            .build();

        assert!(config.validate().unwrap_err().to_string().contains("service_name"));
    }

    #[test]
    fn test_validate_thread_name() {
        let provider = ProviderConfig {
            warmup_thread_name: String::new(),
            ..Default::default()
        };
        let result = HermesConfig::builder().provider(provider.clone()).build_validated();
        assert!(result.is_err());

        // Irrelevant when warm-up is disabled
        let result = HermesConfig::builder()
            .provider(ProviderConfig {
                warmup: WarmupMode::Disabled,
                ..provider
            })
            .build_validated();
        assert!(result.is_ok());
    }

    #[test]
    fn test_presets() {
        let dev = HermesConfig::development();
        assert_eq!(dev.telemetry.logging.format, LogFormat::Pretty);
        assert!(dev.telemetry.logging.include_location);
        assert!(dev.validate().is_ok());

        let prod = HermesConfig::production();
        assert_eq!(prod.telemetry.logging.format, LogFormat::Json);
        assert_eq!(prod.telemetry.logging.level, "info");
        assert!(prod.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = HermesConfig::development();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[provider]"));
        assert!(toml_str.contains("[telemetry.logging]"));

        let parsed: HermesConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_unknown_section_rejected() {
        let toml_str = r#"
            [provider]
            warmup = "disabled"

            [server]
            http_addr = "127.0.0.1:8000"
        "#;

        let result: Result<HermesConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }
}
