//! Converter configuration
//!
//! ```yaml
//! write_mode: create_or_append
//! read_policy: skip_invalid_rows
//! number_formats:
//!   164: date
//!   167: currency
//! ```

use crate::core::decoder::{DecodeKind, NumberFormatRegistry};
use crate::error::SheetResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// What happens when a write targets a sheet that already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Every sheet must be new; an existing sheet name is an error
    #[default]
    CreateOnly,
    /// Existing sheets get their rows appended after the last row
    CreateOrAppend,
}

/// What happens when a data row cannot be bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadPolicy {
    /// Abort the read on the first bad row
    #[default]
    FailFast,
    /// Drop the bad row, log it, keep going
    SkipInvalidRows,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub write_mode: WriteMode,
    pub read_policy: ReadPolicy,
    /// Extra number format ids (usually custom ids ≥ 164) and how to decode them
    pub number_formats: BTreeMap<u32, DecodeKind>,
}

impl ConverterConfig {
    pub fn from_yaml_str(yaml: &str) -> SheetResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> SheetResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    pub fn with_read_policy(mut self, read_policy: ReadPolicy) -> Self {
        self.read_policy = read_policy;
        self
    }

    pub fn with_number_format(mut self, id: u32, kind: DecodeKind) -> Self {
        self.number_formats.insert(id, kind);
        self
    }

    /// Built-in format table extended with the configured ids
    pub fn number_format_registry(&self) -> NumberFormatRegistry {
        let mut registry = NumberFormatRegistry::builtin();
        registry.extend(&self.number_formats);
        registry
    }
}
