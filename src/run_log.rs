//! Per-run log files.
//!
//! Each run can be mirrored into `organize_<YYYYMMDD_HHMMSS>.log`. The file
//! starts with a two-line header followed by a blank line; every log line of
//! the run is appended in the order it was emitted.

use crate::events::LogLine;
use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// An open per-run log file.
pub struct RunLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl RunLog {
    /// Creates the log directory if needed and a new log file named after `started`.
    pub fn create(dir: &Path, started: DateTime<Local>) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(Self::file_name(started));

        let mut writer = BufWriter::new(File::create(&path)?);
        writeln!(
            writer,
            "extsort log - {}",
            started.format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(writer, "{}", "-".repeat(50))?;
        writeln!(writer)?;
        writer.flush()?;

        Ok(Self { path, writer })
    }

    /// `organize_<YYYYMMDD_HHMMSS>.log`
    pub fn file_name(started: DateTime<Local>) -> String {
        format!("organize_{}.log", started.format("%Y%m%d_%H%M%S"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line and flushes so the file is complete even if the process dies.
    pub fn append(&mut self, line: &LogLine) -> io::Result<()> {
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()
    }
}
