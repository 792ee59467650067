//! Folder enumeration.
//!
//! [`walk`] lazily streams every regular file under a root, skipping hidden
//! entries. [`discover`] narrows that down to recognized RAW files and puts
//! them in a deterministic order for progress reporting.

use crate::error::{Error, ErrorKind, Result};
use crate::extension::is_raw;
use async_stream::stream;
use exn::ResultExt;
use futures::{Stream, StreamExt};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

enum WalkEntry {
    File(PathBuf),
    Descend(PathBuf),
    Skip,
}

fn scan_error(e: std::io::Error, dir: &Path) -> Error {
    exn::Exn::from(e).raise(ErrorKind::Scan(dir.to_path_buf()))
}

fn sort_key(path: &Path) -> &[u8] {
    path.file_name().map(OsStr::as_encoded_bytes).unwrap_or_default()
}

/// Hidden means dot-prefixed, like the `ls` default.
fn is_hidden(name: &OsStr) -> bool {
    name.as_encoded_bytes().first() == Some(&b'.')
}

async fn process_entry(entry: DirEntry, recursive: bool) -> Result<WalkEntry> {
    if is_hidden(&entry.file_name()) {
        return Ok(WalkEntry::Skip);
    }
    let path = entry.path();
    // Doesn't follow symlinks: a link is neither a regular file nor a
    // directory, and gets skipped.
    let file_type = entry.file_type().await.or_raise(|| ErrorKind::Scan(path.clone()))?;
    if file_type.is_dir() {
        return Ok(if recursive { WalkEntry::Descend(path) } else { WalkEntry::Skip });
    }
    if file_type.is_file() {
        return Ok(WalkEntry::File(path));
    }
    Ok(WalkEntry::Skip)
}

/// Stream every regular, non-hidden file under `root`.
///
/// Errors reading one directory are yielded and the walk carries on with the
/// next one. A `root` that doesn't exist yields nothing.
pub fn walk(root: impl Into<PathBuf>, recursive: bool) -> impl Stream<Item = Result<PathBuf>> + Send + 'static {
    let mut stack = vec![root.into()];
    stream!({
        'dirs: while let Some(current) = stack.pop() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue 'dirs,
                Err(e) => {
                    yield Err(scan_error(e, &current));
                    continue 'dirs;
                },
            };
            'entries: loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break 'entries,
                    Err(e) => {
                        yield Err(scan_error(e, &current));
                        // A failing iterator won't recover; move on to the next directory.
                        continue 'dirs;
                    },
                };
                match process_entry(entry, recursive).await {
                    Ok(WalkEntry::File(path)) => yield Ok(path),
                    Ok(WalkEntry::Descend(dir)) => stack.push(dir),
                    Ok(WalkEntry::Skip) => {},
                    Err(e) => yield Err(e),
                }
            }
        }
    })
}

/// Find every RAW file under `root`, sorted by file name.
///
/// Names are compared byte-wise; identical names in different sub-folders
/// fall back to comparing the full path. Unreadable sub-folders are logged
/// and skipped, but `root` itself must be a readable directory.
pub async fn discover(root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let metadata = fs::metadata(root).await.or_raise(|| ErrorKind::Scan(root.to_path_buf()))?;
    if !metadata.is_dir() {
        exn::bail!(ErrorKind::Scan(root.to_path_buf()));
    }
    let mut files = Vec::new();
    let mut entries = std::pin::pin!(walk(root, recursive));
    while let Some(entry) = entries.next().await {
        match entry {
            Ok(path) if is_raw(&path) => {
                tracing::trace!(path = %path.display(), "Found RAW file");
                files.push(path);
            },
            Ok(path) => tracing::trace!(path = %path.display(), "Ignoring non-RAW file"),
            Err(e) => tracing::warn!(error = ?e, "Skipping unreadable folder entry"),
        }
    }
    files.sort_by(|a, b| sort_key(a).cmp(sort_key(b)).then_with(|| a.cmp(b)));
    tracing::debug!(root = %root.display(), count = files.len(), "Folder scan complete");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"raw").unwrap();
    }

    fn names(files: &[PathBuf]) -> Vec<String> {
        files.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect()
    }

    #[tokio::test]
    async fn test_walk_skips_hidden_entries() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "visible.cr2");
        touch(dir.path(), ".hidden.cr2");
        touch(dir.path(), ".thumbnails/inside.cr2");
        touch(dir.path(), "sub/nested.nef");
        let mut found: Vec<PathBuf> = walk(dir.path(), true).try_collect().await.unwrap();
        found.sort();
        assert_eq!(found, vec![dir.path().join("sub/nested.nef"), dir.path().join("visible.cr2")]);
    }

    #[tokio::test]
    async fn test_walk_non_recursive() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "top.cr2");
        touch(dir.path(), "sub/nested.nef");
        let found: Vec<PathBuf> = walk(dir.path(), false).try_collect().await.unwrap();
        assert_eq!(found, vec![dir.path().join("top.cr2")]);
    }

    #[tokio::test]
    async fn test_walk_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let found: Vec<PathBuf> = walk(dir.path().join("missing"), true).try_collect().await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_discover_filters_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "IMG_0001.CR2");
        touch(dir.path(), "img_0002.cr2");
        touch(dir.path(), "img_0003.txt");
        let found = discover(dir.path(), true).await.unwrap();
        assert_eq!(names(&found), ["IMG_0001.CR2", "img_0002.cr2"]);
    }

    #[tokio::test]
    async fn test_discover_sorts_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "z/a.cr2");
        touch(dir.path(), "c.nef");
        touch(dir.path(), "a/b.arw");
        touch(dir.path(), "B.orf");
        let found = discover(dir.path(), true).await.unwrap();
        // Byte-wise: uppercase sorts before lowercase; parent folders don't matter.
        assert_eq!(names(&found), ["B.orf", "a.cr2", "b.arw", "c.nef"]);
    }

    #[tokio::test]
    async fn test_discover_same_name_in_different_folders() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b/photo.cr2");
        touch(dir.path(), "a/photo.cr2");
        let found = discover(dir.path(), true).await.unwrap();
        assert_eq!(found, vec![dir.path().join("a/photo.cr2"), dir.path().join("b/photo.cr2")]);
    }

    #[tokio::test]
    async fn test_discover_requires_directory() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "file.cr2");
        let err = discover(&dir.path().join("file.cr2"), true).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Scan(_)));
        let err = discover(&dir.path().join("missing"), true).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Scan(_)));
    }
}
