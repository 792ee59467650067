//! In-memory converter for testing.

use crate::{Converter, Descriptor};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Converter test double.
///
/// Successful conversions write a small placeholder file at the output path,
/// so callers can assert on what ended up on disk. Inputs can be scripted to
/// fail (by file name) with a given descriptor, or to panic mid-conversion.
///
/// # Examples
///
/// ```
/// use raw2dng_convert::{Converter, MockConverter};
/// use std::path::Path;
///
/// let converter = MockConverter::default().failing("broken.cr2", "corrupt header");
/// let descriptor = converter.convert(Path::new("/in/broken.cr2"), Path::new("/out/broken.dng"));
/// assert_eq!(descriptor.as_str(), "corrupt header");
/// assert_eq!(converter.calls().len(), 1);
/// ```
#[derive(Default)]
pub struct MockConverter {
    failures: HashMap<String, String>,
    panics: HashSet<String>,
    calls: Mutex<Vec<(PathBuf, PathBuf)>>,
}

impl MockConverter {
    /// Contents written to every successful output.
    pub const PLACEHOLDER: &'static [u8] = b"II*\0mock-dng";

    /// Fail conversions of inputs with this file name.
    pub fn failing(mut self, file_name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        self.failures.insert(file_name.into(), descriptor.into());
        self
    }

    /// Panic while converting inputs with this file name.
    pub fn panicking(mut self, file_name: impl Into<String>) -> Self {
        self.panics.insert(file_name.into());
        self
    }

    /// Every `(input, output)` pair this converter was called with, in call order.
    pub fn calls(&self) -> Vec<(PathBuf, PathBuf)> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Converter for MockConverter {
    fn convert(&self, input: &Path, output: &Path) -> Descriptor {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push((input.to_path_buf(), output.to_path_buf()));
        let name = input.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if self.panics.contains(&name) {
            // Scripted; callers must survive it.
            panic!("MockConverter: scripted panic for {name}");
        }
        if let Some(descriptor) = self.failures.get(&name) {
            return Descriptor::failure(descriptor.clone());
        }
        match std::fs::write(output, Self::PLACEHOLDER) {
            Ok(()) => Descriptor::success(),
            Err(e) => Descriptor::failure(format!("mock write failed: {e}")),
        }
    }
}
