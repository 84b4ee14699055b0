//! Run defaults and file filtering configuration.
//!
//! This module loads defaults for a run (extensions, strategy, log directory)
//! and file filtering rules from TOML configuration files. Filters support:
//! - Hidden file handling
//! - Exact filename matching
//! - Glob pattern matching against the path relative to the source
//! - Regex pattern matching against the file name
//! - Include (whitelist) rules that override exclude rules
//!
//! # Configuration File Format
//!
//! ```toml
//! [organize]
//! extensions = ["jpg", "png"]
//! strategy = "scan-first"
//! log_dir = "logs"
//!
//! [filters]
//! include_hidden = true
//!
//! [filters.exclude]
//! filenames = ["Thumbs.db"]
//! patterns = ["**/cache/**"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//! ```

use crate::engine::Strategy;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".extsortrc.toml";

/// Failures while reading a configuration file or compiling its filters.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// An explicitly named file does not exist.
    ConfigNotFound(PathBuf),
    /// The file is not valid TOML for [`OrganizerConfig`].
    ConfigInvalid(String),
    InvalidGlobPattern(String),
    InvalidRegexPattern { pattern: String, reason: String },
    IoError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::InvalidGlobPattern(pattern) => {
                write!(
                    f,
                    "Invalid glob pattern '{}': expected *.ext or dir/**",
                    pattern
                )
            }
            ConfigError::InvalidRegexPattern { pattern, reason } => {
                write!(f, "Invalid regex pattern '{}': {}", pattern, reason)
            }
            ConfigError::IoError(msg) => write!(f, "IO error reading configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizerConfig {
    /// Defaults for a run; command-line flags take precedence.
    #[serde(default)]
    pub organize: OrganizeDefaults,

    /// Which files take part in a run at all.
    #[serde(default)]
    pub filters: FilterRules,
}

/// Run defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizeDefaults {
    /// Extensions to select when none are given on the command line.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Transfer strategy when none is given on the command line.
    #[serde(default)]
    pub strategy: Option<Strategy>,

    /// Directory for per-run log files.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

/// `[filters]`: which files a run considers at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether hidden files (starting with ".") are considered. Defaults to true.
    #[serde(default = "default_include_hidden")]
    pub include_hidden: bool,

    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Whitelist; a match here beats every exclude rule.
    #[serde(default)]
    pub include: IncludeRules,
}

fn default_include_hidden() -> bool {
    true
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            include_hidden: default_include_hidden(),
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

/// Rules for excluding files from a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// File names dropped wherever they appear, such as `Thumbs.db`.
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Globs matched against the path below the source root.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Regexes matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// `[filters.include]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl OrganizerConfig {
    /// Loads the first configuration found among `config_path`,
    /// `./.extsortrc.toml` and `~/.config/extsort/config.toml`, or the
    /// defaults when none exists.
    ///
    /// # Errors
    ///
    /// Fails if the chosen file is missing (only possible for `config_path`),
    /// unreadable or malformed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("extsort")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }
}

impl FilterRules {
    /// Compile the rules into matchers.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob patterns are invalid.
    pub fn compile(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(self)
    }

    /// True when the rules can never exclude anything.
    pub fn is_permissive(&self) -> bool {
        self.include_hidden
            && self.exclude.filenames.is_empty()
            && self.exclude.patterns.is_empty()
            && self.exclude.regex.is_empty()
    }
}

/// Pre-compiled filter rules, consulted by the engine before classification.
#[derive(Debug)]
pub struct CompiledFilters {
    include_hidden: bool,
    exclude_filenames: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let compile_globs = |patterns: &[String]| {
            patterns
                .iter()
                .map(|pattern| {
                    Pattern::new(pattern)
                        .map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
                })
                .collect::<Result<Vec<_>, _>>()
        };

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            include_hidden: rules.include_hidden,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_patterns: compile_globs(&rules.exclude.patterns)?,
            exclude_regexes,
            include_patterns: compile_globs(&rules.include.patterns)?,
        })
    }

    /// Whether the file at `relative_path` (relative to the source root)
    /// takes part in the run.
    ///
    /// An include pattern match wins outright. Otherwise the file is dropped
    /// if it is hidden and hidden files are off, or if its name, a glob or a
    /// regex matches an exclude rule.
    pub fn should_include(&self, relative_path: &Path) -> bool {
        let file_name = relative_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self
            .include_patterns
            .iter()
            .any(|pattern| pattern.matches_path(relative_path))
        {
            return true;
        }

        if !self.include_hidden && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if self
            .exclude_patterns
            .iter()
            .any(|pattern| pattern.matches_path(relative_path))
        {
            return false;
        }

        !self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(&file_name))
    }
}
