use crate::access::{AccessGuard, ResourceHandle, ScopedResource};
use crate::extension::output_path;
use derive_more::Display;
use raw2dng_convert::Converter;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Bytes read from each input before conversion when preflight is enabled.
const PREFLIGHT_BYTES: u64 = 16;

/// One input paired with where its converted copy will be written.
pub struct ConversionTask {
    /// Position in the batch, starting at zero.
    pub index: usize,
    pub input: ResourceHandle,
    /// Display name for progress reporting (the input's file name).
    pub name: String,
    /// `None` when the input has no file name to derive an output from.
    pub output: Option<PathBuf>,
    /// An earlier item in the batch already writes to `output`.
    pub collides: bool,
}
impl ConversionTask {
    pub fn new(index: usize, input: ResourceHandle, output_dir: &Path) -> Self {
        let path = input.path();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let output = output_path(path, output_dir);
        Self { index, input, name, output, collides: false }
    }
}

/// Flag every task whose output path was already claimed by an earlier one.
///
/// Paths are compared case-insensitively, since `IMG_1.dng` and `img_1.dng`
/// are the same file on many filesystems.
pub(crate) fn mark_collisions<'a>(tasks: impl IntoIterator<Item = &'a mut ConversionTask>) {
    let mut claimed = HashSet::new();
    for task in tasks {
        let Some(output) = task.output.as_deref() else {
            continue;
        };
        if !claimed.insert(output.to_string_lossy().to_lowercase()) {
            tracing::debug!(index = task.index, output = %output.display(), "Output already claimed");
            task.collides = true;
        }
    }
}

/// Why a single item failed. Never fatal to the rest of the batch.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Scoped access to the input or the output folder was refused.
    #[display("access denied")]
    AccessDenied,
    /// The converter returned a non-empty descriptor, panicked, or the item
    /// could not be converted safely at all.
    #[display("conversion failed")]
    ConversionFailed,
    /// Reading the input ahead of conversion failed.
    #[display("read error")]
    ReadError,
}

#[derive(Clone, Debug, Display, PartialEq, Eq)]
#[display("{kind}: {descriptor}")]
pub struct Failure {
    pub kind: FailureKind,
    /// Never empty.
    pub descriptor: String,
}

/// The result of converting one item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemOutcome {
    Success,
    Failure(Failure),
}
impl ItemOutcome {
    pub fn failure(kind: FailureKind, descriptor: impl Into<String>) -> Self {
        Self::Failure(Failure { kind, descriptor: descriptor.into() })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Per-item record kept for diagnostics once an item is resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemResult {
    pub index: usize,
    pub name: String,
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub outcome: ItemOutcome,
}

/// Convert a single item. Blocking: call from a blocking context.
///
/// Access to the input and the output folder is held only for the duration
/// of this call and is released on every exit path, including a panic in
/// the converter. Items that could clobber their own input, or the output
/// of an earlier item, are refused before the converter ever sees them.
pub(crate) fn convert_task(
    converter: &dyn Converter,
    output: &dyn ScopedResource,
    task: &ConversionTask,
    preflight: bool,
) -> ItemOutcome {
    let Some(target) = task.output.as_deref() else {
        return ItemOutcome::failure(FailureKind::ConversionFailed, "input has no file name");
    };
    let source = task.input.path();
    if same_location(source, target) {
        return ItemOutcome::failure(FailureKind::ConversionFailed, "output would overwrite input");
    }
    if task.collides {
        return ItemOutcome::failure(FailureKind::ConversionFailed, "output name collides with an earlier input");
    }

    let Some(_input_access) = AccessGuard::acquire(&*task.input) else {
        return ItemOutcome::failure(FailureKind::AccessDenied, "permission denied");
    };
    let Some(_output_access) = AccessGuard::acquire(output) else {
        return ItemOutcome::failure(FailureKind::AccessDenied, "permission denied");
    };

    if preflight && let Err(descriptor) = read_head(source) {
        return ItemOutcome::failure(FailureKind::ReadError, descriptor);
    }

    match converter.convert(source, target).into_result() {
        Ok(()) if !target.is_file() => {
            ItemOutcome::failure(FailureKind::ConversionFailed, "converter reported success but wrote no output")
        },
        Ok(()) => ItemOutcome::Success,
        Err(descriptor) => ItemOutcome::failure(FailureKind::ConversionFailed, descriptor),
    }
}

/// Make sure the input can actually be read before handing it over.
fn read_head(path: &Path) -> Result<(), String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    let mut head = Vec::with_capacity(PREFLIGHT_BYTES as usize);
    match file.take(PREFLIGHT_BYTES).read_to_end(&mut head) {
        Ok(0) => Err("file is empty".to_string()),
        Ok(_) => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

/// Whether two paths name the same file, even if spelled differently. The
/// output doesn't exist yet, so compare canonical parents plus file names.
fn same_location(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    let resolve = |p: &Path| Some(p.parent()?.canonicalize().ok()?.join(p.file_name()?));
    match (resolve(a), resolve(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
