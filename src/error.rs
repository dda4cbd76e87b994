use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// The source could not be turned into a base table. Fatal to startup.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("cannot read {}: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("{} is missing required columns: {}", .path.display(), .columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },

    #[error("{} is malformed: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("unsupported file extension for {}: .{extension}", .path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },
}

/// The source was readable but no listing survived the positive-price filter.
///
/// Not fatal: the explorer keeps running and every projection is empty.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{} has no listings with a positive price ({dropped} rows dropped)", .path.display())]
pub struct EmptyDatasetError {
    pub path: PathBuf,
    pub dropped: usize,
}

/// A filter that the engine refuses to apply. Never clamped or swapped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidFilterError {
    #[error("price range is inverted: min {min} > max {max}")]
    InvertedRange { min: i64, max: i64 },

    #[error("unknown region '{region}'")]
    UnknownRegion { region: String },
}
