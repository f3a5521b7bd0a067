use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::*;
use sheetgather::{ExtractConfig, Extractor, FileStatus, RunReport};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "gathercli")]
#[command(about = "Aggregate named columns out of a directory tree of XLSX files")]
#[command(version)]
struct Cli {
    /// Directory to scan recursively (or a single workbook file)
    #[arg(value_name = "SOURCE")]
    source: PathBuf,

    /// Path of the aggregated JSON artifact
    #[arg(short, long, value_name = "FILE", default_value = "output_data.json")]
    output: PathBuf,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Summary format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored summary
    Human,
    /// JSON summary for scripting
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if let Some(config_path) = &cli.config {
        ExtractConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        ExtractConfig::default()
    };
    config.validate().context("Invalid configuration")?;

    let files = collect_files(&cli.source)?;
    if files.is_empty() {
        anyhow::bail!(
            "No spreadsheet files found under {}",
            cli.source.display()
        );
    }

    let extractor = Extractor::with_config(config);
    let report = extractor.extract_to_file(&files, &cli.output)?;

    match cli.format {
        OutputFormat::Human => print_human(&report, &cli.output),
        OutputFormat::Json => print_json(&report, &cli.output)?,
    }

    Ok(())
}

/// Recursively collect workbook files, skipping Office owner-lock temp files
/// ("~$" prefix). Sorted for a stable processing order in logs.
fn collect_files(source: &Path) -> Result<Vec<PathBuf>> {
    if source.is_file() {
        return Ok(vec![source.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(source) {
        let entry = entry.with_context(|| format!("Failed to scan {}", source.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with("~$") {
            continue;
        }
        let is_workbook = entry
            .path()
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.eq_ignore_ascii_case("xlsx") || s.eq_ignore_ascii_case("xlsm"))
            .unwrap_or(false);
        if is_workbook {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn print_human(report: &RunReport, output: &Path) {
    for file in &report.files {
        let warning = match &file.status {
            FileStatus::Extracted => continue,
            FileStatus::NotAContainer => "not a spreadsheet container, skipped".to_string(),
            FileStatus::NoWorksheet => "no worksheet part".to_string(),
            FileStatus::HeaderNotFound => "headers not found".to_string(),
            FileStatus::Failed(reason) => format!("processing failed: {}", reason),
        };
        println!(
            "{} {}: {}",
            "WARN".yellow().bold(),
            file.path.display(),
            warning
        );
    }

    println!();
    println!("{}", "Summary:".bold().underline());
    println!("  {} {}", "Files processed:".bold(), report.files_processed());
    println!("  {} {}", "Files skipped:".bold(), report.files_skipped());
    println!("  {} {}", "Files with data:".bold(), report.files_with_data());
    println!("  {} {}", "Unique keys:".bold(), report.unique_keys());
    println!(
        "  {} {}",
        "Saved to:".bold(),
        output.display().to_string().cyan()
    );
}

fn print_json(report: &RunReport, output: &Path) -> Result<()> {
    let warnings: Vec<_> = report
        .files
        .iter()
        .filter(|f| f.status != FileStatus::Extracted)
        .map(|f| {
            serde_json::json!({
                "file": f.path.display().to_string(),
                "status": status_label(&f.status),
            })
        })
        .collect();

    let summary = serde_json::json!({
        "output": output.display().to_string(),
        "warnings": warnings,
        "summary": {
            "files_processed": report.files_processed(),
            "files_skipped": report.files_skipped(),
            "files_with_data": report.files_with_data(),
            "unique_keys": report.unique_keys(),
        }
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn status_label(status: &FileStatus) -> String {
    match status {
        FileStatus::Extracted => "extracted".to_string(),
        FileStatus::NotAContainer => "not_a_container".to_string(),
        FileStatus::NoWorksheet => "no_worksheet".to_string(),
        FileStatus::HeaderNotFound => "header_not_found".to_string(),
        FileStatus::Failed(reason) => format!("failed: {}", reason),
    }
}
