//! Application configuration.
//!
//! Loaded once at startup from a TOML file layered with `MM__`-prefixed
//! environment overrides (`MM__MAKER__ORDERBOOK__MAX_VOLUME=40`), then
//! validated. Immutable afterwards.

use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use mm_core::{CurrencyPair, Price};
use mm_maker::MakerConfig;
use mm_telemetry::DEFAULT_FILTER;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "MM";
/// Nested key separator in environment overrides.
pub const ENV_SEPARATOR: &str = "__";

/// External reference price feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceConfig {
    #[serde(default = "default_reference_enabled")]
    pub enabled: bool,

    #[serde(default = "default_reference_base_url")]
    pub base_url: String,

    #[serde(default = "default_reference_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            enabled: default_reference_enabled(),
            base_url: default_reference_base_url(),
            timeout_ms: default_reference_timeout_ms(),
        }
    }
}

impl ReferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// In-memory exchange used for dry runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PaperConfig {
    /// Initial last traded price; zero means no trade yet.
    #[serde(default)]
    pub last_price: Price,

    /// Orders below this quote value are rejected.
    #[serde(default)]
    pub min_notional: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryConfig {
    /// Log filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Traded pair, `BASE/QUOTE`.
    pub pair: CurrencyPair,

    #[serde(default)]
    pub reference: ReferenceConfig,

    #[serde(default)]
    pub paper: PaperConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub maker: MakerConfig,
}

impl AppConfig {
    /// Load from `path` with environment overrides, then validate.
    pub fn load(path: &str) -> AppResult<Self> {
        let config: Self = Config::builder()
            .add_source(File::new(path, FileFormat::Toml))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML without environment overrides, then validate.
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.maker.validate()?;

        if self.reference.enabled {
            if self.reference.base_url.trim().is_empty() {
                return Err(AppError::Config(
                    "reference.base_url must be set when reference is enabled".to_string(),
                ));
            }
            if self.reference.timeout_ms == 0 {
                return Err(AppError::Config("reference.timeout_ms must be > 0".to_string()));
            }
        }
        if self.paper.last_price.inner().is_sign_negative() {
            return Err(AppError::Config("paper.last_price must be >= 0".to_string()));
        }
        Ok(())
    }
}

fn default_reference_enabled() -> bool {
    true
}

fn default_reference_base_url() -> String {
    "https://api.binance.com".to_string()
}

fn default_reference_timeout_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    DEFAULT_FILTER.to_string()
}
