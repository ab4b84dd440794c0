//! Configuration loading and validation

mod schema;

pub use schema::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Parse a configuration file without validating it.
///
/// `.json` files are read as JSON, everything else as YAML.
pub fn read_config(path: &Path) -> Result<VelocurveConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let config = if is_json {
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?
    } else {
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?
    };
    Ok(config)
}

/// Load and validate a configuration file
pub fn load_config(path: &Path) -> Result<VelocurveConfig> {
    let config = read_config(path)?;
    config.validate()?;
    Ok(config)
}

/// Values given on the command line. They win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub input: Option<String>,
    pub output: Option<String>,
    pub control: Option<String>,
    pub curve: Option<CurveKind>,
    pub exponent: Option<f64>,
    pub sensitivity: Option<f64>,
    pub threshold: Option<u8>,
    pub debug: bool,
}

impl Overrides {
    pub fn apply(self, config: &mut VelocurveConfig) {
        // Empty strings count as "not given"
        let given = |v: Option<String>| v.filter(|s| !s.is_empty());

        if let Some(input) = given(self.input) {
            config.devices.input = input;
        }
        if let Some(output) = given(self.output) {
            config.devices.output = output;
        }
        if let Some(control) = given(self.control) {
            config.devices.control = Some(control);
        }
        if let Some(kind) = self.curve {
            config.curve.kind = kind;
        }
        if let Some(exponent) = self.exponent {
            config.curve.exponent = exponent;
        }
        if let Some(sensitivity) = self.sensitivity {
            config.curve.sensitivity = sensitivity;
        }
        if let Some(threshold) = self.threshold {
            config.curve.threshold = threshold;
        }
        config.debug |= self.debug;
    }
}
