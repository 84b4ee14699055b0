//! Decides whether a file belongs to the selected extension set.
//!
//! Matching is a case-insensitive *suffix* test: a file's extension matches a
//! selected entry when it ends with it. Selected entries always carry their
//! leading dot, so this is equality in practice:
//!
//! - `gz` is stored as `.gz` and does not match `x.tgz` (`.tgz` does not end
//!   with `.gz`). An undotted suffix test would have matched it.
//! - A multi-part selection such as `.tar.gz` never matches, because a file's
//!   extension is only the part after its last dot (`.gz`).

use crate::extension::{ExtensionSet, split_extension};

/// Classifies file names against an [`ExtensionSet`].
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    extensions: &'a ExtensionSet,
}

impl<'a> Classifier<'a> {
    pub fn new(extensions: &'a ExtensionSet) -> Self {
        Self { extensions }
    }

    /// Returns true iff `file_name` matches one of the selected extensions.
    ///
    /// ```
    /// use extsort::classifier::Classifier;
    /// use extsort::extension::ExtensionSet;
    ///
    /// let set = ExtensionSet::new(["jpg"]).unwrap();
    /// let classifier = Classifier::new(&set);
    /// assert!(classifier.matches("Holiday.JPG"));
    /// assert!(!classifier.matches("ajpg"));
    /// ```
    pub fn matches(&self, file_name: &str) -> bool {
        self.classify(file_name).is_some()
    }

    /// Returns the file's lower-cased extension if it matches, `None` otherwise.
    pub fn classify(&self, file_name: &str) -> Option<String> {
        let extension = Self::extension_of(file_name);
        self.extensions
            .iter()
            .any(|selected| extension.ends_with(selected))
            .then_some(extension)
    }

    /// The lower-cased extension of `file_name`, including its leading dot.
    /// Empty when the name has no extension.
    pub fn extension_of(file_name: &str) -> String {
        split_extension(file_name).1.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(entries: &[&str]) -> ExtensionSet {
        ExtensionSet::new(entries.iter().copied()).unwrap()
    }

    #[test]
    fn test_matches_case_insensitively() {
        let extensions = set(&["jpg", "png"]);
        let classifier = Classifier::new(&extensions);

        assert!(classifier.matches("a.jpg"));
        assert!(classifier.matches("B.JPG"));
        assert!(classifier.matches("c.Png"));
        assert!(!classifier.matches("d.gif"));
    }

    #[test]
    fn test_names_without_extension_never_match() {
        let extensions = set(&["jpg"]);
        let classifier = Classifier::new(&extensions);

        assert!(!classifier.matches("ajpg"));
        assert!(!classifier.matches("jpg"));
        assert!(!classifier.matches(".jpg"));
    }

    #[test]
    fn test_only_last_extension_is_considered() {
        let extensions = set(&["gz"]);
        let classifier = Classifier::new(&extensions);
        assert!(classifier.matches("archive.tar.gz"));

        let extensions = set(&["tar.gz"]);
        let classifier = Classifier::new(&extensions);
        assert!(!classifier.matches("archive.tar.gz"));
    }

    #[test]
    fn test_suffix_test_does_not_cross_dot_boundary() {
        let extensions = set(&["peg"]);
        let classifier = Classifier::new(&extensions);
        assert!(!classifier.matches("photo.jpeg"));
    }

    #[test]
    fn test_classify_returns_lowercased_extension() {
        let extensions = set(&["mp4"]);
        let classifier = Classifier::new(&extensions);
        assert_eq!(classifier.classify("Clip.MP4"), Some(".mp4".to_string()));
        assert_eq!(classifier.classify("clip.mov"), None);
    }

    #[test]
    fn test_dotted_entries_do_not_match_longer_extensions() {
        let extensions = set(&["gz", "png"]);
        let classifier = Classifier::new(&extensions);

        assert!(classifier.matches("x.gz"));
        assert!(!classifier.matches("x.tgz"));
        assert!(!classifier.matches("icon.apng"));
    }
}
