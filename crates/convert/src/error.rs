//! Converter Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Only setting up a converter can fail with an [`Error`]. A failed
//! conversion is reported through a [`Descriptor`](crate::Descriptor)
//! instead, because one bad file must never abort a batch.

use derive_more::{Display, Error};

/// A converter error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for converter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("no RAW to DNG converter detected on your system")]
    ConverterNotFound,
    /// The argument template is missing the `{input}` or `{output}` placeholder.
    #[display("converter arguments must reference both {{input}} and {{output}}")]
    InvalidArguments,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
