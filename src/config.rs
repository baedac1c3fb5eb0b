//! Gateway configuration using Figment.
//!
//! Configuration is layered, later sources winning:
//! 1. built-in defaults
//! 2. `config/gateway.toml` (or the path passed to [`GatewayConfig::load_from`])
//! 3. environment variables prefixed with `IFKIT_`, nested with `__`
//!
//! ```no_run
//! use ifkit_gateway::config::GatewayConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // IFKIT_DEVICE__SERIAL=12345 overrides [device] serial
//! let config = GatewayConfig::load()?;
//! config.validate()?;
//! println!("Serving {}", config.device.namespace);
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use ifkit_core::{Calibration, SerialFilter};
use ifkit_driver_mock::{FaultConfig, MockInterfaceKitConfig};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::gateway::GatewaySettings;
use crate::logging::{parse_log_level, OutputFormat};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/gateway.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "IFKIT_";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Device selection
    #[serde(default)]
    pub device: DeviceConfig,
    /// Raw-to-volts constants latched on attach
    #[serde(default)]
    pub calibration: Calibration,
    /// Simulated device used by `serve`
    #[serde(default)]
    pub simulation: MockInterfaceKitConfig,
    /// Fault injection for the simulated device
    #[serde(default)]
    pub faults: FaultInjectionConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

/// Which device to open and how to label it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Serial number to open; 0 opens any device
    #[serde(default)]
    pub serial: i32,
    /// Prefix for log lines
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

/// Random per-call failures on the simulated device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaultInjectionConfig {
    /// Probability (0.0 - 1.0) that any channel call fails
    #[serde(default)]
    pub failure_rate: f64,
    /// RNG seed; unset means entropy
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_name() -> String {
    "InterfaceKit Gateway".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_namespace() -> String {
    "/interfacekit".to_string()
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            serial: 0,
            namespace: default_namespace(),
        }
    }
}

impl FaultInjectionConfig {
    /// Build the driver-side fault configuration.
    pub fn to_fault_config(&self) -> FaultConfig {
        if self.failure_rate > 0.0 {
            FaultConfig::random_failures_seeded(self.failure_rate, self.seed)
        } else {
            FaultConfig::none()
        }
    }
}

impl GatewayConfig {
    /// Load from `config/gateway.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from a specific file path and the environment.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Ok(Self::figment(path.as_ref()).extract()?)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(GatewayConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_log_level(&self.application.log_level).map_err(|reason| ConfigError::Invalid {
            field: "application.log_level",
            reason,
        })?;

        self.application
            .log_format
            .parse::<OutputFormat>()
            .map_err(|reason| ConfigError::Invalid {
                field: "application.log_format",
                reason,
            })?;

        if self.device.namespace.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "device.namespace",
                reason: "must not be empty".to_string(),
            });
        }

        if self.device.serial < 0 {
            return Err(ConfigError::Invalid {
                field: "device.serial",
                reason: format!("must be 0 (any) or a serial number, got {}", self.device.serial),
            });
        }

        self.calibration
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                field: "calibration",
                reason,
            })?;

        if !(0.0..=1.0).contains(&self.faults.failure_rate) {
            return Err(ConfigError::Invalid {
                field: "faults.failure_rate",
                reason: format!("must be within 0.0..=1.0, got {}", self.faults.failure_rate),
            });
        }

        Ok(())
    }

    /// Serial filter used to open the device.
    pub fn serial_filter(&self) -> SerialFilter {
        SerialFilter::from_serial(self.device.serial)
    }

    /// Settings handed to the gateway.
    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            namespace: self.device.namespace.clone(),
            calibration: self.calibration,
        }
    }
}
