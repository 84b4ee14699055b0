//! Named groups of extensions for quick selection.
//!
//! Each preset expands to a fixed list of extensions that can be combined
//! with individually chosen ones.
//!
//! # Examples
//!
//! ```
//! use extsort::presets::Preset;
//!
//! assert!(Preset::Images.extensions().contains(&"jpg"));
//! assert_eq!(Preset::Archives.to_string(), "archives");
//! ```
use std::fmt;

/// A predefined group of file types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Preset {
    /// Image files (JPG, PNG, GIF, etc.)
    Images,
    /// Video files (MP4, MKV, AVI, etc.)
    Videos,
    /// Audio files (MP3, WAV, FLAC, etc.)
    Audio,
    /// Document files (PDF, DOCX, TXT, etc.)
    Documents,
    /// Archive files (ZIP, RAR, 7Z, etc.)
    Archives,
}

impl Preset {
    /// All presets, in display order.
    pub const ALL: [Preset; 5] = [
        Preset::Images,
        Preset::Videos,
        Preset::Audio,
        Preset::Documents,
        Preset::Archives,
    ];

    /// Extensions in this preset, without leading dots.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Preset::Images => &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "ico"],
            Preset::Videos => &["mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v"],
            Preset::Audio => &["mp3", "wav", "flac", "aac", "m4a", "ogg", "wma"],
            Preset::Documents => &[
                "pdf", "doc", "docx", "xls", "xlsx", "txt", "ppt", "pptx",
            ],
            Preset::Archives => &["zip", "rar", "7z", "tar", "gz"],
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Preset::Images => "images",
            Preset::Videos => "videos",
            Preset::Audio => "audio",
            Preset::Documents => "documents",
            Preset::Archives => "archives",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::ExtensionSet;
    use std::collections::HashSet;

    #[test]
    fn test_every_preset_builds_a_valid_set() {
        for preset in Preset::ALL {
            let set = ExtensionSet::new(preset.extensions().iter().copied())
                .expect("preset extensions are valid");
            assert_eq!(set.len(), preset.extensions().len(), "{}", preset);
        }
    }

    #[test]
    fn test_presets_do_not_overlap() {
        let mut seen = HashSet::new();
        for preset in Preset::ALL {
            for ext in preset.extensions() {
                assert!(seen.insert(*ext), "{} appears in two presets", ext);
            }
        }
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Preset::Images.to_string(), "images");
        assert_eq!(Preset::Documents.to_string(), "documents");
    }
}
