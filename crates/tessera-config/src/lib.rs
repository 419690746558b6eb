//! # tessera-config: Configuration for `Tessera` workload runs
//!
//! Settings come from several layers, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. `~/.config/tessera/config.toml`
//! 3. `tessera.toml` in the project directory
//! 4. `tessera.local.toml` in the project directory
//! 5. `TESSERA_*` environment variables
//!
//! ```toml
//! [workload]
//! name = "RawTenantAccess"
//! seed = 7
//! clients = 1
//!
//! [workload.options]
//! tenantCount = "200"
//! testDuration = "60"
//!
//! [store]
//! conflict_probability = 0.05
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Complete configuration for one workload run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseraConfig {
    pub workload: WorkloadConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

impl TesseraConfig {
    /// Rejects settings no run could use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.workload.validate()?;
        self.store.validate()?;
        Ok(())
    }

    /// Renders the effective configuration as TOML.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ============================================================================
// Workload
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Registered workload name.
    pub name: String,
    /// Base seed; each client derives its own stream from it.
    pub seed: u64,
    /// Number of clients. Only client 0 drives traffic.
    pub clients: usize,
    /// Raw workload options, passed through unparsed.
    pub options: BTreeMap<String, String>,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            name: "RawTenantAccess".to_string(),
            seed: 0,
            clients: 1,
            options: BTreeMap::new(),
        }
    }
}

impl WorkloadConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "workload.name must not be empty".to_string(),
            ));
        }
        if self.clients == 0 {
            return Err(ConfigError::ValidationError(
                "workload.clients must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Store
// ============================================================================

/// Fault injection and timing for the reference store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub conflict_probability: f64,
    pub too_old_probability: f64,
    pub unknown_result_probability: f64,
    pub read_fault_probability: f64,
    pub min_latency_us: u64,
    pub max_latency_us: u64,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            conflict_probability: 0.02,
            too_old_probability: 0.01,
            unknown_result_probability: 0.01,
            read_fault_probability: 0.01,
            min_latency_us: 100,
            max_latency_us: 2_000,
            initial_backoff_ms: 10,
            max_backoff_ms: 1_000,
        }
    }
}

impl StoreConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("conflict_probability", self.conflict_probability),
            ("too_old_probability", self.too_old_probability),
            ("unknown_result_probability", self.unknown_result_probability),
            ("read_fault_probability", self.read_fault_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "store.{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.min_latency_us > self.max_latency_us {
            return Err(ConfigError::ValidationError(format!(
                "store.min_latency_us ({}) exceeds store.max_latency_us ({})",
                self.min_latency_us, self.max_latency_us
            )));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::ValidationError(format!(
                "store.initial_backoff_ms ({}) exceeds store.max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Logging
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
