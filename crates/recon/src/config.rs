use serde::Deserialize;

use crate::error::ReconError;

/// Absolute tolerance under which two amounts are considered equal.
pub const DEFAULT_AMOUNT_TOLERANCE: f64 = 0.01;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    #[serde(default)]
    pub tolerance: ToleranceConfig,
    #[serde(default)]
    pub input: InputConfig,
}

// ---------------------------------------------------------------------------
// Tolerance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToleranceConfig {
    /// Absolute amount tolerance, strict (`|a - b| < amount`).
    #[serde(default = "default_amount_tolerance")]
    pub amount: f64,
}

fn default_amount_tolerance() -> f64 {
    DEFAULT_AMOUNT_TOLERANCE
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            amount: DEFAULT_AMOUNT_TOLERANCE,
        }
    }
}

impl ToleranceConfig {
    pub fn amounts_equal(&self, a: f64, b: f64) -> bool {
        (a - b).abs() < self.amount
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    /// Field delimiter, a single ASCII character.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Accepted file extensions, compared case-insensitively, without the dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_delimiter() -> char {
    ','
}

fn default_extensions() -> Vec<String> {
    vec!["csv".into()]
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            extensions: default_extensions(),
        }
    }
}

impl InputConfig {
    pub fn delimiter_byte(&self) -> u8 {
        // validate() guarantees ASCII
        self.delimiter as u8
    }

    pub fn accepts_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let tol = self.tolerance.amount;
        if !tol.is_finite() || tol <= 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "tolerance.amount must be a positive number, got {tol}"
            )));
        }

        if !self.input.delimiter.is_ascii() || self.input.delimiter == '\n' || self.input.delimiter == '"' {
            return Err(ReconError::ConfigValidation(format!(
                "input.delimiter must be a single ASCII character other than newline or quote, got {:?}",
                self.input.delimiter
            )));
        }

        if self.input.extensions.iter().all(|e| e.trim_start_matches('.').is_empty()) {
            return Err(ReconError::ConfigValidation(
                "input.extensions must list at least one extension".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
