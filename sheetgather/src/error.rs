//! Per-file error taxonomy for the extraction pipeline

use thiserror::Error;

/// Failure modes of a single input file.
///
/// None of these abort a batch. Workers fold them into a per-file status so
/// the summary can report *why* a file contributed nothing; the merge step
/// only ever sees "this file produced N pairs".
#[derive(Debug, Error)]
pub enum FileError {
    /// The file is not a valid ZIP container.
    #[error("not a spreadsheet container")]
    NotAContainer,

    /// A required archive part is absent.
    #[error("missing archive part: {0}")]
    MissingPart(String),

    /// XML parse failure inside a part. The whole file's contribution is
    /// discarded, even if some rows were already projected.
    #[error("malformed part {part}: {reason}")]
    MalformedPart { part: String, reason: String },

    /// No row within the scan window named all required columns.
    #[error("required header columns not found")]
    HeaderNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
