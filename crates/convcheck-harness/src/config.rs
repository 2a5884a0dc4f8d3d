//! Harness configuration.

use crate::compare::Tolerance;
use crate::error::{HarnessError, Result};
use convcheck_core::{DeviceKind, Precision};
use convcheck_ir::IrVersion;
use serde::{Deserialize, Serialize};

/// Environment variable selecting the execution device (`CPU` or `GPU`).
pub const ENV_DEVICE: &str = "CONVCHECK_DEVICE";
/// Environment variable selecting the precision (`FP32` or `FP16`).
pub const ENV_PRECISION: &str = "CONVCHECK_PRECISION";
/// Environment variable selecting the IR version.
pub const ENV_IR_VERSION: &str = "CONVCHECK_IR_VERSION";
/// Environment variable overriding the input seed.
pub const ENV_SEED: &str = "CONVCHECK_SEED";

/// Settings shared by every case run through a harness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Device the converted model runs on.
    pub device: DeviceKind,
    /// Precision the converted model runs at.
    pub precision: Precision,
    /// Requested IR version. Checked by the converter, not here.
    pub ir_version: u32,
    /// Seed for input generation.
    pub seed: u64,
    /// Comparison tolerance; `None` picks one from the precision.
    pub tolerance: Option<Tolerance>,
    /// Leave the artifact in the scratch directory after a passing case.
    pub keep_artifacts: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            device: DeviceKind::Cpu,
            precision: Precision::FP32,
            ir_version: IrVersion::LATEST.get(),
            seed: 0,
            tolerance: None,
            keep_artifacts: true,
        }
    }
}

impl HarnessConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the execution device.
    pub fn with_device(mut self, device: DeviceKind) -> Self {
        self.device = device;
        self
    }

    /// Set the precision.
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// Set the IR version.
    pub fn with_ir_version(mut self, ir_version: u32) -> Self {
        self.ir_version = ir_version;
        self
    }

    /// Set the input seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Override the comparison tolerance.
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Keep or remove artifacts of passing cases.
    pub fn with_keep_artifacts(mut self, keep: bool) -> Self {
        self.keep_artifacts = keep;
        self
    }

    /// Tolerance used for comparison.
    pub fn effective_tolerance(&self) -> Tolerance {
        self.tolerance
            .unwrap_or_else(|| Tolerance::for_precision(self.precision))
    }

    /// Read the runner flags from the process environment.
    ///
    /// Unset variables keep their defaults; malformed values are errors.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`HarnessConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_DEVICE) {
            config.device = value
                .parse()
                .map_err(|e| HarnessError::Config(format!("{}: {}", ENV_DEVICE, e)))?;
        }
        if let Some(value) = lookup(ENV_PRECISION) {
            config.precision = value
                .parse()
                .map_err(|e| HarnessError::Config(format!("{}: {}", ENV_PRECISION, e)))?;
        }
        if let Some(value) = lookup(ENV_IR_VERSION) {
            config.ir_version = value.trim().parse().map_err(|_| {
                HarnessError::Config(format!("{}: '{}' is not a number", ENV_IR_VERSION, value))
            })?;
        }
        if let Some(value) = lookup(ENV_SEED) {
            config.seed = value.trim().parse().map_err(|_| {
                HarnessError::Config(format!("{}: '{}' is not a number", ENV_SEED, value))
            })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.device, DeviceKind::Cpu);
        assert_eq!(config.precision, Precision::FP32);
        assert_eq!(config.ir_version, 11);
        assert_eq!(config.seed, 0);
        assert_eq!(config.effective_tolerance(), Tolerance::FP32);
    }

    #[test]
    fn test_from_lookup_reads_all_flags() {
        let config = HarnessConfig::from_lookup(lookup(&[
            (ENV_DEVICE, "gpu"),
            (ENV_PRECISION, "FP16"),
            (ENV_IR_VERSION, "10"),
            (ENV_SEED, "42"),
        ]))
        .unwrap();
        assert_eq!(config.device, DeviceKind::Gpu);
        assert_eq!(config.precision, Precision::FP16);
        assert_eq!(config.ir_version, 10);
        assert_eq!(config.seed, 42);
        assert_eq!(config.effective_tolerance(), Tolerance::FP16);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        for (key, value) in [
            (ENV_DEVICE, "tpu"),
            (ENV_PRECISION, "int8"),
            (ENV_IR_VERSION, "eleven"),
            (ENV_SEED, "-1"),
        ] {
            let result = HarnessConfig::from_lookup(lookup(&[(key, value)]));
            assert!(
                matches!(result, Err(HarnessError::Config(_))),
                "{}={} should be rejected",
                key,
                value
            );
        }
    }

    #[test]
    fn test_serde_fills_missing_fields() {
        let config: HarnessConfig =
            serde_json::from_str(r#"{"precision": "FP16", "seed": 7}"#).unwrap();
        assert_eq!(config.precision, Precision::FP16);
        assert_eq!(config.seed, 7);
        assert_eq!(config.device, DeviceKind::Cpu);
        assert!(config.keep_artifacts);
    }
}
