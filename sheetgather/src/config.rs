//! Configuration for the extraction run

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Extraction configuration
///
/// Column names are matched against header cells after normalization
/// (trim + uppercase), so `key_column = "Super Category"` matches a header
/// cell containing `" SUPER CATEGORY "`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Header cell naming the grouping-key column.
    pub key_column: String,
    /// Header cell naming the value column.
    pub value_column: String,
    /// Rows to inspect per file before giving up on header discovery.
    pub header_scan_limit: usize,
    /// Worker thread override. Defaults to available cores minus one.
    pub workers: Option<usize>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            key_column: "SUPER CATEGORY".to_string(),
            value_column: "PRODUCT GROUP".to_string(),
            header_scan_limit: 50,
            workers: None,
        }
    }
}

impl ExtractConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ExtractConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with. Unlike per-file
    /// failures, a configuration defect fails the whole run loudly.
    pub fn validate(&self) -> Result<()> {
        if self.key_column.trim().is_empty() {
            anyhow::bail!("Configuration error: key_column must not be empty");
        }
        if self.value_column.trim().is_empty() {
            anyhow::bail!("Configuration error: value_column must not be empty");
        }
        if self.header_scan_limit == 0 {
            anyhow::bail!("Configuration error: header_scan_limit must be at least 1");
        }
        if self.workers == Some(0) {
            anyhow::bail!("Configuration error: workers must be at least 1");
        }
        Ok(())
    }

    /// JSON field name for the grouping key in the output artifact,
    /// derived from the column name ("SUPER CATEGORY" -> "super_category").
    pub fn key_field(&self) -> String {
        self.key_column
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
    }
}
