/// Filesystem operations for placing copies into extension folders.
///
/// This module creates extension folders, picks a collision-free name via
/// [`NameResolver`], and copies file contents together with the source's
/// timestamps. Sources are only ever read.
use crate::extension::folder_name;
use crate::name_resolver::NameResolver;
use filetime::FileTime;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::iter;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

/// A single file that could not be copied.
///
/// These are recoverable: the engine logs them and moves on to the next file.
#[derive(Debug)]
pub enum TransferError {
    /// The extension folder could not be created.
    FolderCreationFailed { path: PathBuf, source: io::Error },
    /// Reading the source or writing the copy failed.
    CopyFailed {
        source_path: PathBuf,
        destination: PathBuf,
        source: io::Error,
    },
}

impl std::fmt::Display for TransferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FolderCreationFailed { path, source } => {
                write!(f, "Failed to create folder {}: {}", path.display(), source)
            }
            Self::CopyFailed {
                source_path,
                destination,
                source,
            } => {
                write!(
                    f,
                    "Failed to copy {} to {}: {}",
                    source_path.display(),
                    destination.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for TransferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FolderCreationFailed { source, .. } | Self::CopyFailed { source, .. } => {
                Some(source)
            }
        }
    }
}

/// Result type for per-file transfers.
pub type TransferResult<T> = Result<T, TransferError>;

/// Creates `path` and any missing parents. Existing directories are fine.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// Copies `file_path` into `dest_root/<EXT>/`, never overwriting.
///
/// `extension` is the file's normalized extension (`".jpg"`); the folder is
/// created on demand. Returns the path the copy was published under.
pub fn copy_to_extension_folder(
    dest_root: &Path,
    file_path: &Path,
    extension: &str,
) -> TransferResult<PathBuf> {
    let folder = dest_root.join(folder_name(extension));
    ensure_dir(&folder).map_err(|e| TransferError::FolderCreationFailed {
        path: folder.clone(),
        source: e,
    })?;

    let file_name = file_path
        .file_name()
        .ok_or_else(|| TransferError::CopyFailed {
            source_path: file_path.to_path_buf(),
            destination: folder.clone(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "file has no name component"),
        })?;

    let destination = NameResolver::resolve(&folder, file_name);
    copy_preserving(file_path, &destination).map_err(|e| TransferError::CopyFailed {
        source_path: file_path.to_path_buf(),
        destination: destination.clone(),
        source: e,
    })?;

    Ok(destination)
}

/// Copies `src` to `dst` byte for byte and carries over permissions and
/// access and modification times.
///
/// The bytes land in a freshly created hidden file in `dst`'s folder and are
/// renamed into place once complete, so `dst` never appears half-written.
pub fn copy_preserving(src: &Path, dst: &Path) -> io::Result<u64> {
    let folder = dst.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent folder")
    })?;
    let metadata = fs::metadata(src)?;
    let mut reader = File::open(src)?;
    let (partial, mut writer) = create_partial(folder, partial_names())?;

    let result = (|| -> io::Result<u64> {
        let bytes = io::copy(&mut reader, &mut writer)?;
        drop(writer);
        filetime::set_file_times(
            &partial,
            FileTime::from_last_access_time(&metadata),
            FileTime::from_last_modification_time(&metadata),
        )?;
        fs::set_permissions(&partial, metadata.permissions())?;
        fs::rename(&partial, dst)?;
        Ok(bytes)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

/// Temporary names tried per copy before giving up.
const PARTIAL_ATTEMPTS: usize = 64;

static PARTIAL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `.extsort-<pid>-<n>.partial`, independent of the final name's length.
fn partial_names() -> impl Iterator<Item = String> {
    let pid = process::id();
    iter::repeat_with(move || {
        let n = PARTIAL_COUNTER.fetch_add(1, Ordering::Relaxed);
        format!(".extsort-{}-{}.partial", pid, n)
    })
}

/// Creates the first of `names` that does not exist yet in `folder`.
/// Existing files are never opened for writing.
fn create_partial<I>(folder: &Path, names: I) -> io::Result<(PathBuf, File)>
where
    I: IntoIterator,
    I::Item: AsRef<Path>,
{
    for name in names.into_iter().take(PARTIAL_ATTEMPTS) {
        let path = folder.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "no free temporary name in destination folder",
    ))
}
