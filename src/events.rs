//! Events emitted by a transfer run.
//!
//! A run produces an ordered stream of [`ProgressEvent`]s: timestamped log
//! lines, progress updates, and exactly one terminal [`RunOutcome`]. Consumers
//! receive them in emission order.

use crate::engine::Strategy;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    /// Recoverable problems, such as a single file failing to copy.
    Warn,
    /// Problems that end the run.
    Error,
}

/// A human-readable, timestamped log message.
///
/// Renders as `[YYYY-MM-DD HH:MM:SS] message`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

impl LogLine {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.message
        )
    }
}

/// One item on a run's event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A line for the log sink.
    Log(LogLine),
    /// Direct strategy: number of files copied so far. No total is known.
    Counter { processed: usize },
    /// ScanFirst strategy: copy-phase progress.
    Progress {
        completed: usize,
        total: usize,
        percent: u8,
    },
    /// The run is over. Always the last event of a run.
    Finished(RunOutcome),
}

/// How a run ended. Every run ends in exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Walk (and copy phase) ran to the end. `failed` files were logged and skipped.
    Completed { processed: usize, failed: usize },
    /// Stopped early on request after copying `processed` files.
    Cancelled { processed: usize },
    /// ScanFirst found nothing to copy; the copy phase was skipped.
    NoMatches,
    /// Source or destination was unusable; nothing was done.
    PreconditionFailed { reason: String },
    /// An unexpected error ended the run.
    Failed { processed: usize, reason: String },
}

impl RunOutcome {
    /// Files successfully copied during the run.
    pub fn processed(&self) -> usize {
        match self {
            Self::Completed { processed, .. }
            | Self::Cancelled { processed }
            | Self::Failed { processed, .. } => *processed,
            Self::NoMatches | Self::PreconditionFailed { .. } => 0,
        }
    }

    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed { .. } | Self::NoMatches => 0,
            Self::Cancelled { .. } => 130,
            Self::PreconditionFailed { .. } | Self::Failed { .. } => 1,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed { processed, failed } if *failed > 0 => {
                write!(f, "completed: {} copied, {} failed", processed, failed)
            }
            Self::Completed { processed, .. } => write!(f, "completed: {} copied", processed),
            Self::Cancelled { processed } => {
                write!(f, "cancelled after {} copied", processed)
            }
            Self::NoMatches => write!(f, "no matching files"),
            Self::PreconditionFailed { reason } => write!(f, "not started: {}", reason),
            Self::Failed { processed, reason } => {
                write!(f, "failed after {} copied: {}", processed, reason)
            }
        }
    }
}

/// Machine-readable summary printed by `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub strategy: Strategy,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub extensions: Vec<String>,
    pub outcome: RunOutcome,
    pub log_file: Option<PathBuf>,
}

/// `floor(completed / total * 100)`, or 0 when there is nothing to do.
pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed.min(total) * 100) / total) as u8
}
