//! extsort - copy files into one folder per extension
//!
//! This library walks a source tree, selects files whose names end in one of
//! a chosen set of extensions, and copies each into `<destination>/<EXT>/`
//! with its timestamps preserved and without overwriting existing files.
//! Runs execute on a worker thread, report progress through an event
//! channel, and can be paused, resumed and cancelled.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod directory_filter;
pub mod engine;
pub mod events;
pub mod extension;
pub mod fs_ops;
pub mod name_resolver;
pub mod output;
pub mod presets;
pub mod run_log;

pub use classifier::Classifier;
pub use config::{CompiledFilters, ConfigError, OrganizerConfig};
pub use directory_filter::DirectoryFilter;
pub use engine::{EngineError, RunHandle, Strategy, TransferEngine, TransferRequest, TransferTask};
pub use events::{LogLevel, LogLine, ProgressEvent, RunOutcome, RunSummary};
pub use extension::{ExtensionError, ExtensionSet};
pub use fs_ops::{TransferError, TransferResult};
pub use name_resolver::NameResolver;
pub use presets::Preset;

pub use cli::{Cli, run_cli};
