use std::fmt;

use serde::Serialize;

use crate::model::Side;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad tolerance, empty extension list, etc.).
    ConfigValidation(String),
    /// Input file extension is not an accepted delimited-text type.
    InvalidFileType { path: String, extension: String },
    /// Required column missing after header normalization.
    Schema { side: Side, column: String },
    /// IO error (file read, etc.).
    Io { path: String, message: String },
}

impl ReconError {
    /// True when the load was rejected before the side's record set would
    /// have been replaced.
    pub fn rejected_before_replace(&self) -> bool {
        matches!(self, Self::InvalidFileType { .. } | Self::Schema { .. })
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::InvalidFileType { path, extension } => {
                if extension.is_empty() {
                    write!(f, "'{path}': not a delimited text file (no extension)")
                } else {
                    write!(f, "'{path}': unsupported file type '.{extension}'")
                }
            }
            Self::Schema { side, column } => {
                write!(f, "{side} data: missing required column '{column}'")
            }
            Self::Io { path, message } => write!(f, "cannot read '{path}': {message}"),
        }
    }
}

impl std::error::Error for ReconError {}

/// Non-fatal diagnostic raised while parsing a source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseWarning {
    pub side: Side,
    /// 1-based line in the source file, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    pub message: String,
}

impl ParseWarning {
    pub fn new(side: Side, line: Option<u64>, message: impl Into<String>) -> Self {
        Self { side, line, message: message.into() }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} line {line}: {}", self.side, self.message),
            None => write!(f, "{}: {}", self.side, self.message),
        }
    }
}
