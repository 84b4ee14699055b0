//! Collision-free destination names.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Picks a destination path inside a folder that does not overwrite anything.
pub struct NameResolver;

impl NameResolver {
    /// Returns `dest_folder/file_name` if that path is free, otherwise the first
    /// free `base_1.ext`, `base_2.ext`, ... in the same folder.
    ///
    /// The name is kept as an `OsStr`, so names that are not valid UTF-8 come
    /// through unchanged. A single engine run is the only writer to its
    /// destination, so a name that is free here is still free when the copy
    /// is published.
    ///
    /// ```no_run
    /// use extsort::name_resolver::NameResolver;
    /// use std::path::Path;
    ///
    /// // With "photo.jpg" already present:
    /// let path = NameResolver::resolve(Path::new("/out/JPG"), "photo.jpg");
    /// assert_eq!(path, Path::new("/out/JPG/photo_1.jpg"));
    /// ```
    pub fn resolve(dest_folder: &Path, file_name: impl AsRef<OsStr>) -> PathBuf {
        let file_name = file_name.as_ref();
        let candidate = dest_folder.join(file_name);
        if !is_taken(&candidate) {
            return candidate;
        }

        (1u64..)
            .map(|counter| dest_folder.join(numbered(file_name, counter)))
            .find(|path| !is_taken(path))
            .unwrap_or(candidate)
    }
}

/// `base_<counter>.ext`. The extension starts at the last dot; a name made of
/// leading dots and no other dot (`.bashrc`) has none.
fn numbered(file_name: &OsStr, counter: u64) -> OsString {
    let path = Path::new(file_name);
    let stem = path.file_stem().unwrap_or(file_name);
    let extension = path
        .extension()
        .filter(|_| !stem.to_string_lossy().chars().all(|c| c == '.'));

    let mut name = match extension {
        Some(_) => stem.to_os_string(),
        None => file_name.to_os_string(),
    };
    name.push(format!("_{}", counter));
    if let Some(extension) = extension {
        name.push(".");
        name.push(extension);
    }
    name
}

/// Broken symlinks count as taken.
fn is_taken(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}
