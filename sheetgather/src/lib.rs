//! sheetgather: column extraction and aggregation over XLSX directory trees
//!
//! Streams worksheet XML out of spreadsheet containers, locates header rows
//! heuristically (they are rarely on row 1), and aggregates (key, value)
//! pairs from many files in parallel into one deterministic grouped JSON
//! document.

pub mod config;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod reader;

use anyhow::Result;
use std::path::{Path, PathBuf};

pub use config::ExtractConfig;
pub use error::FileError;
pub use pipeline::{FileReport, FileStatus, RunReport};

/// Main extraction interface
pub struct Extractor {
    config: ExtractConfig,
}

impl Extractor {
    /// Create an extractor with default configuration
    pub fn new() -> Self {
        Self::with_config(ExtractConfig::default())
    }

    /// Create an extractor with custom configuration
    pub fn with_config(config: ExtractConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Process a fixed list of files in parallel and merge their results.
    /// Per-file failures are folded into the report; only a defective
    /// configuration fails the run.
    pub fn extract_files(&self, paths: &[PathBuf]) -> Result<RunReport> {
        pipeline::run(paths, &self.config)
    }

    /// Run the pipeline and write the grouped artifact in one step.
    pub fn extract_to_file(&self, paths: &[PathBuf], output: &Path) -> Result<RunReport> {
        let report = pipeline::run(paths, &self.config)?;
        pipeline::write_output(&report, &self.config.key_field(), output)?;
        Ok(report)
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}
