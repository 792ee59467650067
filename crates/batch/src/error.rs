//! Batch Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Only conditions that stop a batch from starting are errors. Everything
//! that goes wrong with a single file is an
//! [`ItemOutcome::Failure`](crate::ItemOutcome::Failure) instead.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A batch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for batch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Nothing to convert: the file list was empty, or the folder held no
    /// recognized RAW files.
    #[display("no RAW files found")]
    Empty,
    /// Scoped access to the selected folder could not be acquired.
    #[display("unable to access folder: {}", _0.display())]
    AccessDenied(#[error(not(source))] PathBuf),
    /// Walking the selected folder failed.
    #[display("unable to scan folder: {}", _0.display())]
    Scan(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Scan(_))
    }
}
