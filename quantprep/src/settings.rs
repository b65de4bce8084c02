use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

/// Names and default parameters used when rewriting graphs.
///
/// Read from the `quantprep` section of a settings JSON; every field is
/// optional and falls back to [`QuantSettings::default`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuantSettings {
    pub quant_op: String,
    pub dequant_op: String,
    pub observed_suffix: String,
    pub quant_suffix: String,
    pub dequant_suffix: String,
    pub default_scale: f64,
    pub default_zero_point: i64,
}

impl Default for QuantSettings {
    fn default() -> Self {
        Self {
            quant_op: "aten::quantize_linear".to_string(),
            dequant_op: "aten::dequantize".to_string(),
            observed_suffix: ".observed".to_string(),
            quant_suffix: ".quant".to_string(),
            dequant_suffix: ".dequant".to_string(),
            default_scale: 1.0,
            default_zero_point: 0,
        }
    }
}

impl QuantSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let section = match value.get("quantprep") {
            Some(section) => section.clone(),
            None => return Ok(Self::default()),
        };
        let settings: Self = serde_json::from_value(section)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings {}", path.display()))?;
        Self::from_json(&contents).with_context(|| format!("invalid settings {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if self.quant_op.is_empty() || self.dequant_op.is_empty() {
            return Err(anyhow!("quant_op and dequant_op must be non-empty"));
        }
        if self.quant_op == self.dequant_op {
            return Err(anyhow!("quant_op and dequant_op must differ"));
        }
        Ok(())
    }
}
