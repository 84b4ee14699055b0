//! Normalized file-extension sets.
//!
//! An [`ExtensionSet`] holds lower-cased extensions with a leading dot
//! (`".jpg"`, `".png"`). It is built once from user input, validated, and then
//! handed to the engine, which only reads it.
//!
//! # Examples
//!
//! ```
//! use extsort::extension::ExtensionSet;
//!
//! let set = ExtensionSet::new(["JPG", ".png", "jpg"]).unwrap();
//! assert_eq!(set.len(), 2);
//! assert!(set.contains(".jpg"));
//! assert_eq!(set.to_string(), ".jpg, .png");
//! ```

use std::fmt;

/// Errors produced while building an [`ExtensionSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionError {
    /// No extension was supplied at all.
    Empty,
    /// An entry could not be turned into an extension.
    Invalid {
        /// The entry as the user typed it.
        raw: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

impl fmt::Display for ExtensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionError::Empty => write!(f, "No file types selected"),
            ExtensionError::Invalid { raw, reason } => {
                write!(f, "Invalid file type '{}': {}", raw, reason)
            }
        }
    }
}

impl std::error::Error for ExtensionError {}

/// A non-empty, de-duplicated set of normalized extensions.
///
/// Insertion order is kept so log lines and folder creation follow the order
/// the user chose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSet {
    extensions: Vec<String>,
}

impl ExtensionSet {
    /// Builds a set from raw user entries.
    ///
    /// Every entry is trimmed, lower-cased and given a leading dot when it has
    /// none. Duplicates collapse to one entry.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::Empty`] when no entries are given and
    /// [`ExtensionError::Invalid`] for entries that are blank, consist only of
    /// a dot, or contain a path separator.
    pub fn new<I, S>(entries: I) -> Result<Self, ExtensionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut extensions: Vec<String> = Vec::new();
        for entry in entries {
            let normalized = normalize(entry.as_ref())?;
            if !extensions.contains(&normalized) {
                extensions.push(normalized);
            }
        }

        if extensions.is_empty() {
            return Err(ExtensionError::Empty);
        }

        Ok(Self { extensions })
    }

    /// Returns true if `extension` (already normalized) is in the set.
    pub fn contains(&self, extension: &str) -> bool {
        self.extensions.iter().any(|e| e == extension)
    }

    /// Iterates the normalized extensions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Always false for a constructed set; provided for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Destination folder names, one per extension, in insertion order.
    pub fn folder_names(&self) -> Vec<String> {
        self.extensions.iter().map(|e| folder_name(e)).collect()
    }
}

impl fmt::Display for ExtensionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extensions.join(", "))
    }
}

/// Normalizes a single user-supplied extension.
///
/// ```
/// use extsort::extension::normalize;
///
/// assert_eq!(normalize(" JPG ").unwrap(), ".jpg");
/// assert_eq!(normalize(".Tar.Gz").unwrap(), ".tar.gz");
/// assert!(normalize(".").is_err());
/// ```
pub fn normalize(raw: &str) -> Result<String, ExtensionError> {
    let trimmed = raw.trim();
    let body = trimmed.strip_prefix('.').unwrap_or(trimmed);

    if body.is_empty() {
        return Err(ExtensionError::Invalid {
            raw: raw.to_string(),
            reason: "extension is empty",
        });
    }
    if body.contains(['/', '\\']) {
        return Err(ExtensionError::Invalid {
            raw: raw.to_string(),
            reason: "extension must not contain a path separator",
        });
    }

    Ok(format!(".{}", body.to_lowercase()))
}

/// Splits a file name into `(base, extension)`.
///
/// The extension starts at the last dot and keeps it. Leading dots do not
/// start an extension, so `.bashrc` has none.
///
/// ```
/// use extsort::extension::split_extension;
///
/// assert_eq!(split_extension("photo.JPG"), ("photo", ".JPG"));
/// assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
/// assert_eq!(split_extension(".bashrc"), (".bashrc", ""));
/// assert_eq!(split_extension("README"), ("README", ""));
/// ```
pub fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) if file_name[..idx].chars().any(|c| c != '.') => file_name.split_at(idx),
        _ => (file_name, ""),
    }
}

/// Folder name for an extension: leading dots stripped, upper-cased.
///
/// ```
/// use extsort::extension::folder_name;
///
/// assert_eq!(folder_name(".jpg"), "JPG");
/// ```
pub fn folder_name(extension: &str) -> String {
    extension.trim_start_matches('.').to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_adds_dot_and_lowercases() {
        assert_eq!(normalize("PNG").unwrap(), ".png");
        assert_eq!(normalize(".Mp4").unwrap(), ".mp4");
        assert_eq!(normalize("  webp\t").unwrap(), ".webp");
    }

    #[test]
    fn test_normalize_rejects_blank_and_dot() {
        assert!(matches!(normalize(""), Err(ExtensionError::Invalid { .. })));
        assert!(matches!(normalize("   "), Err(ExtensionError::Invalid { .. })));
        assert!(matches!(normalize("."), Err(ExtensionError::Invalid { .. })));
    }

    #[test]
    fn test_normalize_rejects_separators() {
        assert!(normalize("a/b").is_err());
        assert!(normalize("..\\jpg").is_err());
    }

    #[test]
    fn test_set_collapses_duplicates() {
        let set = ExtensionSet::new(["jpg", "JPG", ".jpg", "png"]).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![".jpg", ".png"]);
    }

    #[test]
    fn test_empty_set_is_rejected() {
        let empty: [&str; 0] = [];
        assert_eq!(ExtensionSet::new(empty), Err(ExtensionError::Empty));
    }

    #[test]
    fn test_folder_names() {
        let set = ExtensionSet::new(["jpg", "tar.gz"]).unwrap();
        assert_eq!(set.folder_names(), vec!["JPG", "TAR.GZ"]);
    }

    #[test]
    fn test_split_extension_edge_cases() {
        assert_eq!(split_extension("file."), ("file", "."));
        assert_eq!(split_extension("a..b"), ("a.", ".b"));
        assert_eq!(split_extension("..."), ("...", ""));
        assert_eq!(split_extension("..hidden.txt"), ("..hidden", ".txt"));
    }
}
