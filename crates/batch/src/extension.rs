//! Recognized file extensions and output naming.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Camera RAW extensions recognized when scanning a folder, lowercase and
/// sorted so they can be binary searched.
pub const RAW_EXTENSIONS: [&str; 40] = [
    "3fr", "ari", "arw", "bay", "cap", "cr2", "crw", "data", "dcr", "dcs", "dng", "drf", "eip", "erf", "fff", "gpr",
    "iiq", "k25", "kdc", "mdc", "mef", "mos", "mrw", "nef", "nrw", "obm", "orf", "pef", "ptx", "pxn", "r3d", "raf",
    "raw", "rw2", "rwl", "rwz", "sr2", "srf", "srw", "x3f",
];

/// Extension of every converted file.
pub const DNG_EXTENSION: &str = "dng";

/// Whether the path has a recognized RAW extension (case-insensitive).
///
/// ```
/// use raw2dng_batch::extension::is_raw;
///
/// assert!(is_raw("IMG_0001.CR2"));
/// assert!(is_raw("img_0002.cr2"));
/// assert!(!is_raw("img_0003.txt"));
/// ```
#[must_use]
pub fn is_raw(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| RAW_EXTENSIONS.binary_search(&ext.to_ascii_lowercase().as_str()).is_ok())
}

/// Where the converted copy of `input` goes: same base name, inside
/// `output_dir`, extension replaced (not appended) with `.dng`.
///
/// Returns `None` when `input` has no file name to base the output on.
///
/// ```
/// use raw2dng_batch::extension::output_path;
/// use std::path::Path;
///
/// assert_eq!(output_path("/in/photo.NEF", "/out").unwrap(), Path::new("/out/photo.dng"));
/// assert!(output_path("/", "/out").is_none());
/// ```
#[must_use]
pub fn output_path(input: impl AsRef<Path>, output_dir: impl AsRef<Path>) -> Option<PathBuf> {
    // Not `with_extension()`: a stem like "IMG.0001" would lose its last dot segment.
    let stem = input.as_ref().file_stem()?;
    let mut name = OsString::from(stem);
    name.push(".");
    name.push(DNG_EXTENSION);
    Some(output_dir.as_ref().join(name))
}
