//! Parallel fan-out over input files and single-threaded merge
//!
//! One worker per file, no shared mutable state during the parse phase.
//! Workers communicate only via `FileReport` return values; the merge runs on
//! the coordinating thread after all workers join. Merging is commutative and
//! idempotent per pair, so worker completion order cannot change the result,
//! and any subset of reports still merges into a valid partial aggregate.

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::config::ExtractConfig;
use crate::error::FileError;
use crate::extract;

/// How a file's processing ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// Parsed and projected; the report carries the file's pair set.
    Extracted,
    /// Not a ZIP container; counted as skipped.
    NotAContainer,
    /// Valid container with no worksheet part.
    NoWorksheet,
    /// No row in the scan window named all required columns.
    HeaderNotFound,
    /// Parse or I/O failure; the file's contribution is discarded.
    Failed(String),
}

/// One worker's result. Errors are folded into `status` here, inside the
/// worker; nothing crosses the worker boundary as an error.
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub pairs: BTreeSet<(String, String)>,
    pub status: FileStatus,
}

/// Aggregate of a whole run: the merged grouping plus per-file reports for
/// the logging surface.
#[derive(Debug)]
pub struct RunReport {
    pub groups: BTreeMap<String, BTreeSet<String>>,
    pub files: Vec<FileReport>,
}

impl RunReport {
    /// Files that were actually opened and parsed (including ones that
    /// yielded nothing).
    pub fn files_processed(&self) -> usize {
        self.files.len() - self.files_skipped()
    }

    /// Files rejected outright because they were not containers.
    pub fn files_skipped(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::NotAContainer)
            .count()
    }

    /// Files that contributed at least one pair.
    pub fn files_with_data(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Extracted && !f.pairs.is_empty())
            .count()
    }

    pub fn unique_keys(&self) -> usize {
        self.groups.len()
    }
}

/// Default worker count: one core left free for the coordinating thread.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
        .saturating_sub(1)
        .max(1)
}

/// Fan the file list out over a run-local rayon pool, then merge here.
///
/// A run-local pool (rather than rayon's global one) keeps worker sizing a
/// per-run decision; if pool construction fails the batch degrades to
/// single-threaded execution instead of panicking on first use.
pub fn run(paths: &[PathBuf], config: &ExtractConfig) -> Result<RunReport> {
    config.validate()?;

    let workers = config.workers.unwrap_or_else(default_workers).max(1);
    let try_build = |n| rayon::ThreadPoolBuilder::new().num_threads(n).build();

    let files: Vec<FileReport> = match try_build(workers) {
        Ok(pool) => {
            pool.install(|| paths.par_iter().map(|path| process_file(path, config)).collect())
        }
        Err(_) => paths.iter().map(|path| process_file(path, config)).collect(),
    };

    let groups = merge(&files);
    Ok(RunReport { groups, files })
}

/// Worker body for one file. Infallible by construction: every `FileError`
/// becomes a status with an empty pair set.
fn process_file(path: &Path, config: &ExtractConfig) -> FileReport {
    match extract::extract_file(path, config) {
        Ok(pairs) => FileReport {
            path: path.to_path_buf(),
            pairs,
            status: FileStatus::Extracted,
        },
        Err(err) => {
            let status = match &err {
                FileError::NotAContainer => FileStatus::NotAContainer,
                FileError::MissingPart(_) => FileStatus::NoWorksheet,
                FileError::HeaderNotFound => FileStatus::HeaderNotFound,
                FileError::MalformedPart { .. } | FileError::Io(_) => {
                    FileStatus::Failed(err.to_string())
                }
            };
            FileReport {
                path: path.to_path_buf(),
                pairs: BTreeSet::new(),
                status,
            }
        }
    }
}

/// Merge per-file pair sets into the run-wide grouping. Accepts any subset of
/// reports, so an interrupted batch still renders what completed.
pub fn merge(files: &[FileReport]) -> BTreeMap<String, BTreeSet<String>> {
    let mut groups: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for file in files {
        for (key, value) in &file.pairs {
            groups.entry(key.clone()).or_default().insert(value.clone());
        }
    }
    groups
}

/// Render the merged grouping as ordered JSON records. BTree iteration gives
/// keys ascending and values ascending, so output is byte-for-byte
/// reproducible across runs on the same input set.
pub fn render_records(groups: &BTreeMap<String, BTreeSet<String>>, key_field: &str) -> Vec<Value> {
    groups
        .iter()
        .map(|(key, values)| {
            let mut record = Map::new();
            record.insert(key_field.to_string(), Value::String(key.clone()));
            record.insert(
                "values".to_string(),
                Value::Array(values.iter().cloned().map(Value::String).collect()),
            );
            Value::Object(record)
        })
        .collect()
}

/// Write the final artifact as pretty-printed UTF-8 JSON. The one fatal I/O
/// path in a run.
pub fn write_output(report: &RunReport, key_field: &str, path: &Path) -> Result<()> {
    let records = render_records(&report.groups, key_field);
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &records)
        .with_context(|| format!("Failed to write output file: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(pairs: &[(&str, &str)]) -> FileReport {
        FileReport {
            path: PathBuf::from("test.xlsx"),
            pairs: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            status: FileStatus::Extracted,
        }
    }

    #[test]
    fn test_merge_dedups_across_files() {
        let files = vec![
            report(&[("Foods", "Snacks"), ("Drinks", "Soda")]),
            report(&[("Foods", "Snacks"), ("Drinks", "Juice")]),
        ];
        let groups = merge(&files);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["Foods"].len(), 1);
        assert_eq!(
            groups["Drinks"].iter().collect::<Vec<_>>(),
            vec!["Juice", "Soda"]
        );
    }

    #[test]
    fn test_render_records_shape_and_order() {
        let groups = merge(&[report(&[
            ("Foods", "Snacks"),
            ("Drinks", "Soda"),
            ("Drinks", "Juice"),
        ])]);
        let records = render_records(&groups, "super_category");
        assert_eq!(
            serde_json::to_value(&records).unwrap(),
            serde_json::json!([
                {"super_category": "Drinks", "values": ["Juice", "Soda"]},
                {"super_category": "Foods", "values": ["Snacks"]}
            ])
        );
    }

    #[test]
    fn test_run_rejects_defective_config() {
        let config = ExtractConfig {
            key_column: String::new(),
            ..Default::default()
        };
        assert!(run(&[], &config).is_err());
    }

    #[test]
    fn test_default_workers_at_least_one() {
        assert!(default_workers() >= 1);
    }
}
