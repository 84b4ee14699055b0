//! Transfer engine.
//!
//! The engine walks a source tree and copies every file whose extension is in
//! the selected [`ExtensionSet`] into `destination/<EXT>/`. Two strategies
//! share the same walk:
//!
//! - [`Strategy::Direct`] copies each match as soon as it is found and reports
//!   a running count.
//! - [`Strategy::ScanFirst`] collects all matches first, then copies them in
//!   discovery order and reports exact percentages.
//!
//! A run executes on its own worker thread. The caller keeps a clone of the
//! [`TransferEngine`] to pause, resume or cancel it and reads
//! [`ProgressEvent`]s from the [`RunHandle`]. Pause and cancel are cooperative:
//! they are observed before each directory entry and before each copy, never
//! in the middle of one.
//!
//! # Examples
//!
//! ```no_run
//! use extsort::engine::{Strategy, TransferEngine, TransferRequest};
//! use extsort::events::ProgressEvent;
//! use extsort::extension::ExtensionSet;
//!
//! let extensions = ExtensionSet::new(["jpg", "png"]).unwrap();
//! let request = TransferRequest::new("/photos", "/sorted", extensions, Strategy::ScanFirst);
//!
//! let engine = TransferEngine::new();
//! let run = engine.start(request).unwrap();
//! for event in run.events() {
//!     match event {
//!         ProgressEvent::Log(line) => println!("{}", line),
//!         ProgressEvent::Finished(outcome) => println!("{}", outcome),
//!         _ => {}
//!     }
//! }
//! let outcome = run.wait();
//! ```

use crate::classifier::Classifier;
use crate::config::CompiledFilters;
use crate::directory_filter::DirectoryFilter;
use crate::events::{LogLine, ProgressEvent, RunOutcome, percent};
use crate::extension::ExtensionSet;
use crate::fs_ops;
use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use walkdir::WalkDir;

/// How often a paused run re-checks its flags.
pub const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(100);

const SEPARATOR_WIDTH: usize = 50;

/// Traversal/transfer strategy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Copy while walking; progress is a running count.
    #[default]
    Direct,
    /// Scan everything first, then copy with exact percentages.
    ScanFirst,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Direct => write!(f, "direct"),
            Strategy::ScanFirst => write!(f, "scan-first"),
        }
    }
}

/// Errors that keep a run from being started at all.
///
/// Problems with the source or destination are not reported here; they end
/// the run with [`RunOutcome::PreconditionFailed`] on the event stream.
#[derive(Debug)]
pub enum EngineError {
    /// Another run is still active on this engine.
    AlreadyRunning,
    /// The worker thread could not be spawned.
    WorkerSpawn { source: std::io::Error },
    /// A directory handed to [`TransferEngine::plan`] does not exist.
    MissingDirectory { path: PathBuf },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "A transfer is already running"),
            Self::WorkerSpawn { source } => {
                write!(f, "Failed to start transfer worker: {}", source)
            }
            Self::MissingDirectory { path } => {
                write!(f, "Directory does not exist: {}", path.display())
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Everything a run needs, validated by the caller except for the directories.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub extensions: ExtensionSet,
    pub strategy: Strategy,
    /// Optional exclusion rules applied before classification.
    pub filters: Option<Arc<CompiledFilters>>,
}

impl TransferRequest {
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        extensions: ExtensionSet,
        strategy: Strategy,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            extensions,
            strategy,
            filters: None,
        }
    }

    pub fn with_filters(mut self, filters: CompiledFilters) -> Self {
        self.filters = Some(Arc::new(filters));
        self
    }
}

/// A file found by the scan phase, waiting to be copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTask {
    pub source_path: PathBuf,
    /// Lower-cased extension of the file, with its dot.
    pub extension: String,
}

/// Counters owned by the worker for the duration of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunState {
    /// Files matched so far (ScanFirst: the final scan total).
    pub total_files: usize,
    /// Files copied successfully.
    pub completed_files: usize,
    /// Files that failed to copy.
    pub failed_files: usize,
}

/// Flags shared between the worker and whoever controls it.
#[derive(Debug, Default)]
struct RunControl {
    processing: AtomicBool,
    paused: AtomicBool,
    cancelled: AtomicBool,
}

impl RunControl {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

/// Resets the shared flags when a run ends, however it ends.
struct ActiveRun<'a> {
    control: &'a RunControl,
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        self.control.paused.store(false, Ordering::SeqCst);
        self.control.cancelled.store(false, Ordering::SeqCst);
        self.control.processing.store(false, Ordering::SeqCst);
    }
}

/// Handle to a run executing on a worker thread.
pub struct RunHandle {
    events: Receiver<ProgressEvent>,
    worker: JoinHandle<RunOutcome>,
}

impl RunHandle {
    /// The run's event stream. It ends after [`ProgressEvent::Finished`].
    pub fn events(&self) -> &Receiver<ProgressEvent> {
        &self.events
    }

    /// Blocks until the worker exits and returns the run's outcome.
    pub fn wait(self) -> RunOutcome {
        self.worker
            .join()
            .unwrap_or_else(|payload| RunOutcome::Failed {
                processed: 0,
                reason: panic_message(payload.as_ref()),
            })
    }
}

/// Runs transfers and exposes pause/resume/cancel.
///
/// Clones share the same run state, so a clone can control a run started by
/// another. Only one run may be active per engine at a time.
#[derive(Debug, Clone, Default)]
pub struct TransferEngine {
    control: Arc<RunControl>,
}

impl TransferEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `request` on a dedicated worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyRunning`] if a run is active and
    /// [`EngineError::WorkerSpawn`] if no thread could be created.
    pub fn start(&self, request: TransferRequest) -> Result<RunHandle, EngineError> {
        self.claim()?;

        let (tx, rx) = unbounded();
        let engine = self.clone();
        let worker = thread::Builder::new()
            .name("extsort-worker".to_string())
            .spawn(move || engine.run_claimed(&request, &tx));

        match worker {
            Ok(worker) => Ok(RunHandle { events: rx, worker }),
            Err(source) => {
                self.release();
                Err(EngineError::WorkerSpawn { source })
            }
        }
    }

    /// Runs `request` on the calling thread, sending events to `events`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyRunning`] if a run is active.
    pub fn run(
        &self,
        request: &TransferRequest,
        events: &Sender<ProgressEvent>,
    ) -> Result<RunOutcome, EngineError> {
        self.claim()?;
        Ok(self.run_claimed(request, events))
    }

    /// Performs only the scan phase and returns what a run would copy.
    ///
    /// Nothing is created or copied and no events are emitted.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingDirectory`] if the source is not a
    /// directory, or the destination exists but is not one.
    pub fn plan(&self, request: &TransferRequest) -> Result<Vec<TransferTask>, EngineError> {
        if !request.source.is_dir() {
            return Err(EngineError::MissingDirectory {
                path: request.source.clone(),
            });
        }
        if request.destination.exists() && !request.destination.is_dir() {
            return Err(EngineError::MissingDirectory {
                path: request.destination.clone(),
            });
        }

        let control = RunControl::default();
        let sink = EventSink::discard();
        let mut state = RunState::default();
        let filter = DirectoryFilter::new(&request.destination).map_err(|_| {
            EngineError::MissingDirectory {
                path: request.destination.clone(),
            }
        })?;

        let mut run = Run::new(&control, request, &sink, &mut state);
        // A private control is never cancelled.
        Ok(run.scan(&filter).unwrap_or_default())
    }

    /// Requests a pause. Takes effect at the next checkpoint.
    pub fn pause(&self) {
        if self.is_processing() {
            self.control.paused.store(true, Ordering::SeqCst);
        }
    }

    pub fn resume(&self) {
        self.control.paused.store(false, Ordering::SeqCst);
    }

    /// Pauses a running transfer or resumes a paused one. Returns the new paused state.
    pub fn toggle_pause(&self) -> bool {
        if self.is_paused() {
            self.resume();
        } else {
            self.pause();
        }
        self.is_paused()
    }

    /// Requests cancellation. Also wakes a paused run so it can stop.
    pub fn cancel(&self) {
        if self.is_processing() {
            self.control.cancelled.store(true, Ordering::SeqCst);
            self.control.paused.store(false, Ordering::SeqCst);
        }
    }

    pub fn is_processing(&self) -> bool {
        self.control.processing.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    fn claim(&self) -> Result<(), EngineError> {
        self.control
            .processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| EngineError::AlreadyRunning)?;
        self.control.paused.store(false, Ordering::SeqCst);
        self.control.cancelled.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) {
        drop(ActiveRun {
            control: &self.control,
        });
    }

    fn run_claimed(&self, request: &TransferRequest, events: &Sender<ProgressEvent>) -> RunOutcome {
        let sink = EventSink::new(events.clone());
        let mut state = RunState::default();

        let outcome = {
            let _active = ActiveRun {
                control: &self.control,
            };
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                Run::new(&self.control, request, &sink, &mut state).execute()
            }));
            result.unwrap_or_else(|payload| {
                let reason = panic_message(payload.as_ref());
                sink.log(LogLine::error(format!("Processing error: {}", reason)));
                RunOutcome::Failed {
                    processed: state.completed_files,
                    reason,
                }
            })
        };

        // Flags are already reset, so a consumer may start again on seeing this.
        sink.emit(ProgressEvent::Finished(outcome.clone()));
        outcome
    }
}

/// Marker for a cancellation observed at a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cancelled;

/// Non-blocking event delivery. A dropped receiver just stops listening.
struct EventSink {
    tx: Option<Sender<ProgressEvent>>,
}

impl EventSink {
    fn new(tx: Sender<ProgressEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    fn discard() -> Self {
        Self { tx: None }
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    fn log(&self, line: LogLine) {
        self.emit(ProgressEvent::Log(line));
    }

    fn info(&self, message: impl Into<String>) {
        self.log(LogLine::info(message));
    }

    fn warn(&self, message: impl Into<String>) {
        self.log(LogLine::warn(message));
    }

    fn separator(&self) {
        self.info("=".repeat(SEPARATOR_WIDTH));
    }
}

/// One run in progress.
struct Run<'a> {
    control: &'a RunControl,
    request: &'a TransferRequest,
    classifier: Classifier<'a>,
    sink: &'a EventSink,
    state: &'a mut RunState,
}

impl<'a> Run<'a> {
    fn new(
        control: &'a RunControl,
        request: &'a TransferRequest,
        sink: &'a EventSink,
        state: &'a mut RunState,
    ) -> Self {
        Self {
            control,
            request,
            classifier: Classifier::new(&request.extensions),
            sink,
            state,
        }
    }

    fn execute(&mut self) -> RunOutcome {
        let request = self.request;
        if !request.source.is_dir() || !request.destination.is_dir() {
            let reason = "Source or destination folder does not exist!";
            self.sink.log(LogLine::error(reason));
            return RunOutcome::PreconditionFailed {
                reason: reason.to_string(),
            };
        }

        self.sink
            .info(format!("Scanning folder: {}", request.source.display()));
        self.sink.info(format!("File types: {}", request.extensions));

        for folder in request.extensions.folder_names() {
            let path = request.destination.join(folder);
            if let Err(e) = fs_ops::ensure_dir(&path) {
                return self.fail(format!("cannot create {}: {}", path.display(), e));
            }
        }

        let filter = match DirectoryFilter::new(&request.destination) {
            Ok(filter) => filter,
            Err(e) => return self.fail(e),
        };

        match request.strategy {
            Strategy::Direct => self.run_direct(&filter),
            Strategy::ScanFirst => self.run_scan_first(&filter),
        }
    }

    fn run_direct(&mut self, filter: &DirectoryFilter) -> RunOutcome {
        self.sink.info("Searching and processing files...");
        self.log_locations();

        let walked = self.walk(filter, |run, path, extension| {
            run.state.total_files += 1;
            run.log_found(path);
            run.transfer(path, &extension);
            run.sink.emit(ProgressEvent::Counter {
                processed: run.state.completed_files,
            });
            Ok(())
        });
        if walked.is_err() {
            return self.cancelled();
        }

        self.sink.info(format!(
            "Processing complete! {} files processed",
            self.state.completed_files
        ));
        self.sink.separator();
        self.completed()
    }

    fn run_scan_first(&mut self, filter: &DirectoryFilter) -> RunOutcome {
        self.sink.info("Scanning files...");
        self.log_locations();

        let tasks = match self.scan(filter) {
            Ok(tasks) => tasks,
            Err(Cancelled) => return self.cancelled(),
        };
        self.state.total_files = tasks.len();

        self.sink
            .info(format!("Scan complete, found {} files", tasks.len()));
        self.sink.separator();

        if tasks.is_empty() {
            self.sink.info("No matching files found");
            return RunOutcome::NoMatches;
        }

        self.sink.info("Copying files...");
        let total = tasks.len();
        for task in &tasks {
            if self.checkpoint().is_err() {
                return self.cancelled();
            }
            self.transfer(&task.source_path, &task.extension);
            let completed = self.state.completed_files;
            self.sink.emit(ProgressEvent::Progress {
                completed,
                total,
                percent: percent(completed, total),
            });
        }

        if self.state.completed_files == total {
            self.sink.info("All files processed!");
        } else {
            self.sink.info(format!(
                "Processed {}/{} files",
                self.state.completed_files, total
            ));
        }
        self.sink.separator();
        self.completed()
    }

    /// Scan phase: every matching file, in walk order.
    fn scan(&mut self, filter: &DirectoryFilter) -> Result<Vec<TransferTask>, Cancelled> {
        let mut tasks = Vec::new();
        self.walk(filter, |run, path, extension| {
            run.log_found(path);
            tasks.push(TransferTask {
                source_path: path.to_path_buf(),
                extension,
            });
            Ok(())
        })?;
        Ok(tasks)
    }

    /// Walks the source tree in file-name order, pruning the destination
    /// subtree, and calls `on_match` for every file that passes the filters
    /// and the classifier.
    fn walk<F>(&mut self, filter: &DirectoryFilter, mut on_match: F) -> Result<(), Cancelled>
    where
        F: FnMut(&mut Self, &Path, String) -> Result<(), Cancelled>,
    {
        let request = self.request;
        let mut entries = WalkDir::new(&request.source)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = entries.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    self.sink
                        .warn(format!("Cannot read directory entry: {}", err));
                    continue;
                }
            };

            self.checkpoint()?;

            let path = entry.path();
            if entry.file_type().is_dir() {
                if filter.should_skip(path) {
                    self.sink
                        .info(format!("Skipping output directory: {}", path.display()));
                    entries.skip_current_dir();
                }
                continue;
            }

            if !path.is_file() {
                continue;
            }

            if let Some(filters) = &request.filters {
                let relative = path.strip_prefix(&request.source).unwrap_or(path);
                if !filters.should_include(relative) {
                    continue;
                }
            }

            let file_name = entry.file_name().to_string_lossy();
            if let Some(extension) = self.classifier.classify(&file_name) {
                on_match(self, path, extension)?;
            }
        }

        Ok(())
    }

    /// Cooperative pause/cancel point.
    ///
    /// Blocks while paused, polling every [`PAUSE_POLL_INTERVAL`], and checks
    /// for cancellation again as soon as it wakes.
    fn checkpoint(&self) -> Result<(), Cancelled> {
        if self.control.is_cancelled() {
            return Err(Cancelled);
        }
        if !self.control.is_paused() {
            return Ok(());
        }

        self.sink.info("Processing paused");
        while self.control.is_paused() {
            if self.control.is_cancelled() {
                return Err(Cancelled);
            }
            thread::sleep(PAUSE_POLL_INTERVAL);
        }
        if self.control.is_cancelled() {
            return Err(Cancelled);
        }
        self.sink.info("Processing resumed");
        Ok(())
    }

    /// Copies one file into its extension folder, logging the result.
    fn transfer(&mut self, path: &Path, extension: &str) {
        match fs_ops::copy_to_extension_folder(&self.request.destination, path, extension) {
            Ok(copied) => {
                self.state.completed_files += 1;
                self.sink
                    .info(format!("Copied to: {}", copied.display()));
            }
            Err(err) => {
                self.state.failed_files += 1;
                self.sink
                    .warn(format!("Failed to process file: {}", path.display()));
                self.sink.warn(format!("Error: {}", err));
            }
        }
    }

    fn log_locations(&self) {
        let request = self.request;
        self.sink
            .info(format!("Source folder: {}", request.source.display()));
        self.sink
            .info(format!("Destination folder: {}", request.destination.display()));
        self.sink.info(format!("File types: {}", request.extensions));
    }

    fn log_found(&self, path: &Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.sink.info(format!("Found file: {}", name));
        self.sink.info(format!("Source path: {}", path.display()));
    }

    fn completed(&self) -> RunOutcome {
        RunOutcome::Completed {
            processed: self.state.completed_files,
            failed: self.state.failed_files,
        }
    }

    fn cancelled(&self) -> RunOutcome {
        self.sink.info("Processing cancelled");
        RunOutcome::Cancelled {
            processed: self.state.completed_files,
        }
    }

    fn fail(&self, err: impl fmt::Display) -> RunOutcome {
        let reason = err.to_string();
        self.sink
            .log(LogLine::error(format!("Processing error: {}", reason)));
        RunOutcome::Failed {
            processed: self.state.completed_files,
            reason,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Dirs {
        _temp: TempDir,
        source: PathBuf,
        dest: PathBuf,
    }

    fn dirs() -> Dirs {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let source = temp.path().join("src");
        let dest = temp.path().join("out");
        fs::create_dir(&source).unwrap();
        fs::create_dir(&dest).unwrap();
        Dirs {
            _temp: temp,
            source,
            dest,
        }
    }

    fn request(dirs: &Dirs, extensions: &[&str], strategy: Strategy) -> TransferRequest {
        TransferRequest::new(
            &dirs.source,
            &dirs.dest,
            ExtensionSet::new(extensions.iter().copied()).unwrap(),
            strategy,
        )
    }

    fn run_to_end(request: &TransferRequest) -> (RunOutcome, Vec<ProgressEvent>) {
        let engine = TransferEngine::new();
        let (tx, rx) = unbounded();
        let outcome = engine.run(request, &tx).expect("engine was idle");
        drop(tx);
        (outcome, rx.iter().collect())
    }

    fn messages(events: &[ProgressEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::Log(line) => Some(line.message.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_direct_copies_matching_files() {
        let dirs = dirs();
        fs::write(dirs.source.join("a.jpg"), "a").unwrap();
        fs::write(dirs.source.join("b.txt"), "b").unwrap();

        let (outcome, events) = run_to_end(&request(&dirs, &["jpg"], Strategy::Direct));

        assert_eq!(outcome, RunOutcome::Completed { processed: 1, failed: 0 });
        assert!(dirs.dest.join("JPG/a.jpg").exists());
        assert!(!dirs.dest.join("TXT").exists());
        assert!(events.contains(&ProgressEvent::Counter { processed: 1 }));
        assert_eq!(events.last(), Some(&ProgressEvent::Finished(outcome)));
    }

    #[test]
    fn test_scan_first_reports_percentages() {
        let dirs = dirs();
        for name in ["1.png", "2.png", "3.png", "4.png"] {
            fs::write(dirs.source.join(name), name).unwrap();
        }

        let (outcome, events) = run_to_end(&request(&dirs, &["png"], Strategy::ScanFirst));

        assert_eq!(outcome, RunOutcome::Completed { processed: 4, failed: 0 });
        let percents: Vec<u8> = events
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::Progress { percent, total, .. } => {
                    assert_eq!(*total, 4);
                    Some(*percent)
                }
                _ => None,
            })
            .collect();
        assert_eq!(percents, vec![25, 50, 75, 100]);
        assert!(messages(&events).contains(&"All files processed!".to_string()));
    }

    #[test]
    fn test_scan_first_with_no_matches() {
        let dirs = dirs();
        fs::write(dirs.source.join("notes.txt"), "n").unwrap();

        let (outcome, events) =
            run_to_end(&request(&dirs, &["jpg", "mp4"], Strategy::ScanFirst));

        assert_eq!(outcome, RunOutcome::NoMatches);
        assert!(dirs.dest.join("JPG").is_dir());
        assert!(dirs.dest.join("MP4").is_dir());
        assert!(messages(&events).contains(&"No matching files found".to_string()));
        assert!(!messages(&events).contains(&"Copying files...".to_string()));
    }

    #[test]
    fn test_missing_source_fails_precondition() {
        let dirs = dirs();
        let mut request = request(&dirs, &["jpg"], Strategy::Direct);
        request.source = dirs.source.join("missing");

        let engine = TransferEngine::new();
        let (tx, rx) = unbounded();
        let outcome = engine.run(&request, &tx).unwrap();
        drop(tx);

        assert!(matches!(outcome, RunOutcome::PreconditionFailed { .. }));
        assert!(!engine.is_processing());
        assert!(!dirs.dest.join("JPG").exists());
        let events: Vec<_> = rx.iter().collect();
        assert!(matches!(
            events.first(),
            Some(ProgressEvent::Log(line)) if line.level == crate::events::LogLevel::Error
        ));
    }

    #[test]
    fn test_destination_inside_source_is_pruned() {
        let dirs = dirs();
        let nested_dest = dirs.source.join("sorted");
        fs::create_dir(&nested_dest).unwrap();
        fs::create_dir(nested_dest.join("JPG")).unwrap();
        fs::write(nested_dest.join("JPG/old.jpg"), "old").unwrap();
        fs::write(dirs.source.join("new.jpg"), "new").unwrap();

        for strategy in [Strategy::Direct, Strategy::ScanFirst] {
            let request = TransferRequest::new(
                &dirs.source,
                &nested_dest,
                ExtensionSet::new(["jpg"]).unwrap(),
                strategy,
            );
            let (outcome, events) = run_to_end(&request);
            assert_eq!(outcome.processed(), 1, "strategy {}", strategy);
            assert!(
                messages(&events)
                    .iter()
                    .any(|m| m.starts_with("Skipping output directory:"))
            );
        }

        assert!(nested_dest.join("JPG/new.jpg").exists());
        assert!(nested_dest.join("JPG/new_1.jpg").exists());
        assert!(!nested_dest.join("JPG/old_1.jpg").exists());
    }

    #[test]
    fn test_second_run_is_rejected_while_active() {
        let dirs = dirs();
        fs::write(dirs.source.join("a.jpg"), "a").unwrap();

        let engine = TransferEngine::new();
        engine.control.processing.store(true, Ordering::SeqCst);
        let result = engine.start(request(&dirs, &["jpg"], Strategy::Direct));
        assert!(matches!(result, Err(EngineError::AlreadyRunning)));

        engine.release();
        let run = engine
            .start(request(&dirs, &["jpg"], Strategy::Direct))
            .expect("engine is idle again");
        assert_eq!(run.wait().processed(), 1);
    }

    #[test]
    fn test_cancel_while_paused_stops_without_resume() {
        let dirs = dirs();
        for i in 0..5 {
            fs::write(dirs.source.join(format!("{}.jpg", i)), "x").unwrap();
        }

        let engine = TransferEngine::new();
        engine.control.processing.store(true, Ordering::SeqCst);
        engine.pause();
        let request = request(&dirs, &["jpg"], Strategy::ScanFirst);

        let control = engine.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(250));
            control.cancel();
        });

        let (tx, rx) = unbounded();
        let outcome = engine.run_claimed(&request, &tx);
        canceller.join().unwrap();
        drop(tx);

        assert_eq!(outcome, RunOutcome::Cancelled { processed: 0 });
        assert!(!engine.is_processing());
        assert!(!engine.is_paused());
        let messages = messages(&rx.iter().collect::<Vec<_>>());
        assert!(messages.contains(&"Processing paused".to_string()));
        assert!(messages.contains(&"Processing cancelled".to_string()));
        assert!(!messages.contains(&"Processing resumed".to_string()));
    }

    #[test]
    fn test_resume_after_pause_finishes_the_run() {
        let dirs = dirs();
        for i in 0..5 {
            fs::write(dirs.source.join(format!("{}.jpg", i)), "x").unwrap();
        }

        let engine = TransferEngine::new();
        engine.control.processing.store(true, Ordering::SeqCst);
        engine.pause();
        let request = request(&dirs, &["jpg"], Strategy::Direct);

        let control = engine.clone();
        let resumer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(250));
            assert!(control.is_paused());
            control.resume();
        });

        let (tx, rx) = unbounded();
        let outcome = engine.run_claimed(&request, &tx);
        resumer.join().unwrap();
        drop(tx);

        assert_eq!(
            outcome,
            RunOutcome::Completed {
                processed: 5,
                failed: 0
            }
        );
        assert_eq!(fs::read_dir(dirs.dest.join("JPG")).unwrap().count(), 5);
        assert!(!engine.is_processing());

        let messages = messages(&rx.iter().collect::<Vec<_>>());
        let paused = messages.iter().position(|m| m == "Processing paused");
        let resumed = messages.iter().position(|m| m == "Processing resumed");
        let first_copy = messages.iter().position(|m| m.starts_with("Copied to: "));
        assert!(paused.is_some() && resumed.is_some());
        assert!(paused < resumed && resumed < first_copy);
        assert!(!messages.contains(&"Processing cancelled".to_string()));
    }

    #[test]
    fn test_plan_creates_nothing() {
        let dirs = dirs();
        fs::create_dir(dirs.source.join("sub")).unwrap();
        fs::write(dirs.source.join("sub/b.jpg"), "b").unwrap();
        fs::write(dirs.source.join("a.JPG"), "a").unwrap();
        fs::write(dirs.source.join("c.txt"), "c").unwrap();

        let tasks = TransferEngine::new()
            .plan(&request(&dirs, &["jpg"], Strategy::ScanFirst))
            .unwrap();

        assert_eq!(
            tasks,
            vec![
                TransferTask {
                    source_path: dirs.source.join("a.JPG"),
                    extension: ".jpg".to_string(),
                },
                TransferTask {
                    source_path: dirs.source.join("sub/b.jpg"),
                    extension: ".jpg".to_string(),
                },
            ]
        );
        assert_eq!(fs::read_dir(&dirs.dest).unwrap().count(), 0);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
