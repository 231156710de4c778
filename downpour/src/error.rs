use std::fmt;

use serde::{Deserialize, Serialize};

/// Errors reported by the pipeline.
///
/// Parsing itself never fails: malformed Markdown degrades to text. Errors
/// only come from configuration (raised once, when a pipeline is built) and
/// from input that is not valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Input is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 { valid_up_to: usize },

    #[error("Extension {extension} requires the renderer to implement '{capability}'")]
    MissingCapability {
        extension: &'static str,
        capability: &'static str,
    },

    #[error("Unknown {kind} bits {bits:#x}")]
    UnknownFlags { kind: FlagKind, bits: u32 },

    #[error("Unknown {kind} name '{name}'")]
    UnknownFlagName { kind: FlagKind, name: String },

    #[error("Failed to serialize document: {0}")]
    Serialize(String),
}

/// Which flag set an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagKind {
    Extension,
    Render,
}

impl fmt::Display for FlagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagKind::Extension => f.write_str("extension"),
            FlagKind::Render => f.write_str("render flag"),
        }
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8 {
            valid_up_to: err.valid_up_to(),
        }
    }
}
