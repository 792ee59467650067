//! Single-file RAW to DNG conversion.
//!
//! The pixel work is done elsewhere: a native codec, an external program,
//! a test double. This crate only defines the seam the batch orchestrator
//! talks to ([`Converter`]) and the value it gets back ([`Descriptor`]).
//!
//! - [`CommandConverter`] runs an external program once per file.
//! - Any `Fn(&Path, &Path) -> Descriptor` closure is also a [`Converter`].
//! - `MockConverter` (feature `mock`) writes placeholder output for tests.

mod command;
pub mod error;
#[cfg(feature = "mock")]
mod mock;

pub use crate::command::{CommandConverter, DEFAULT_ARGS};
#[cfg(feature = "mock")]
pub use crate::mock::MockConverter;
use derive_more::Display;
use std::path::Path;
use std::sync::Arc;

/// Shared handle to a converter, cheap to clone into blocking tasks.
pub type ConverterHandle = Arc<dyn Converter>;

/// The error descriptor returned by a single conversion.
///
/// An empty descriptor means success. Anything else is a human-readable
/// reason for failure, surfaced verbatim in logs and per-item results.
#[derive(Clone, Debug, Default, Display, PartialEq, Eq, Hash)]
pub struct Descriptor(String);
impl Descriptor {
    /// The empty descriptor.
    #[must_use]
    pub fn success() -> Self {
        Self(String::new())
    }

    /// A failure descriptor. An empty reason is replaced so that a failure
    /// can never be mistaken for success.
    #[must_use]
    pub fn failure(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        match reason.trim().is_empty() {
            true => Self("unknown conversion error".to_string()),
            false => Self(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Ok(())` for the empty descriptor, `Err(reason)` otherwise.
    pub fn into_result(self) -> Result<(), String> {
        match self.is_success() {
            true => Ok(()),
            false => Err(self.0),
        }
    }
}
impl From<String> for Descriptor {
    fn from(value: String) -> Self {
        Self(value)
    }
}
impl From<&str> for Descriptor {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Converts one RAW file into one DNG file.
///
/// Implementations are called from a blocking context, once per file, and
/// may block for as long as the conversion takes. No state is assumed to
/// carry over between calls.
pub trait Converter: Send + Sync {
    fn convert(&self, input: &Path, output: &Path) -> Descriptor;
}

impl<F> Converter for F
where
    F: Fn(&Path, &Path) -> Descriptor + Send + Sync,
{
    fn convert(&self, input: &Path, output: &Path) -> Descriptor {
        self(input, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_success_is_empty() {
        let descriptor = Descriptor::success();
        assert!(descriptor.is_success());
        assert_eq!(descriptor.as_str(), "");
        assert_eq!(Descriptor::default(), descriptor);
        assert_eq!(descriptor.into_result(), Ok(()));
    }

    #[rstest]
    #[case("unsupported camera", "unsupported camera")]
    #[case("", "unknown conversion error")]
    #[case("   ", "unknown conversion error")]
    fn test_failure_is_never_empty(#[case] reason: &str, #[case] expected: &str) {
        let descriptor = Descriptor::failure(reason);
        assert!(!descriptor.is_success());
        assert_eq!(descriptor.into_result(), Err(expected.to_string()));
    }

    #[test]
    fn test_from_string_keeps_empty_as_success() {
        // Mirrors the primitive's own contract: empty string means success.
        assert!(Descriptor::from(String::new()).is_success());
        assert!(!Descriptor::from("bad header").is_success());
    }

    #[test]
    fn test_closure_converter() {
        let converter: ConverterHandle = Arc::new(|input: &Path, _output: &Path| match input.extension() {
            Some(ext) if ext == "cr2" => Descriptor::success(),
            _ => Descriptor::failure("not a CR2"),
        });
        assert!(converter.convert(Path::new("a.cr2"), Path::new("a.dng")).is_success());
        assert_eq!(converter.convert(Path::new("b.nef"), Path::new("b.dng")).as_str(), "not a CR2");
    }
}
