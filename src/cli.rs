//! Command-line interface module for extsort.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Resolving extensions, strategy and filters from flags and configuration
//! - Dry-run planning
//! - Driving a run and rendering its events
//! - Forwarding pause/resume/cancel commands typed on stdin

use crate::config::OrganizerConfig;
use crate::engine::{RunHandle, Strategy, TransferEngine, TransferRequest};
use crate::events::{ProgressEvent, RunOutcome, RunSummary};
use crate::extension::{ExtensionSet, folder_name};
use crate::output::OutputFormatter;
use crate::presets::Preset;
use crate::run_log::RunLog;
use clap::Parser;
use indicatif::ProgressBar;
use serde_json::json;
use std::collections::HashMap;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;

/// Log directory used when neither the command line nor the config names one.
pub const DEFAULT_LOG_DIR: &str = "extsort_logs";

/// Copy files from a directory tree into one folder per extension.
#[derive(Debug, Clone, Parser)]
#[command(name = "extsort", version, about)]
pub struct Cli {
    /// Directory tree to collect files from
    pub source: PathBuf,

    /// Directory that receives one sub-folder per extension
    pub destination: PathBuf,

    /// Extensions to collect; repeat the flag or separate with commas (e.g. -e jpg,png)
    #[arg(short = 'e', long = "ext", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Add a predefined group of extensions
    #[arg(short, long, value_enum)]
    pub preset: Vec<Preset>,

    /// Transfer strategy [default: direct]
    #[arg(short, long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Configuration file (defaults to .extsortrc.toml, then ~/.config/extsort/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for organize_*.log files
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Do not write a log file
    #[arg(long)]
    pub no_log_file: bool,

    /// Only list what would be copied
    #[arg(long)]
    pub dry_run: bool,

    /// Do not echo log lines to the console
    #[arg(short, long)]
    pub quiet: bool,

    /// Print a JSON summary instead of console output
    #[arg(long)]
    pub json: bool,

    /// Ignore pause/cancel commands on stdin
    #[arg(long)]
    pub no_input: bool,
}

/// Runs the CLI with parsed arguments and returns the process exit code.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use extsort::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["extsort", "/photos", "/sorted", "-e", "jpg,png"]);
/// match run_cli(&cli) {
///     Ok(code) => std::process::exit(code),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<i32, String> {
    let config = OrganizerConfig::load(cli.config.as_deref())
        .map_err(|e| format!("Error loading configuration: {}", e))?;

    let request = build_request(cli, &config)?;
    let engine = TransferEngine::new();

    if cli.dry_run {
        return dry_run(&engine, &request, cli.json);
    }

    let log_dir = cli
        .log_dir
        .clone()
        .or_else(|| config.organize.log_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));
    let console = !cli.quiet && !cli.json;

    let run_log = if cli.no_log_file {
        None
    } else {
        match RunLog::create(&log_dir, chrono::Local::now()) {
            Ok(log) => Some(log),
            Err(e) => {
                OutputFormatter::warning(&format!(
                    "Could not create log file in {}: {}",
                    log_dir.display(),
                    e
                ));
                None
            }
        }
    };
    let log_file = run_log.as_ref().map(|log| log.path().to_path_buf());

    let handle = engine
        .start(request.clone())
        .map_err(|e| format!("Error: {}", e))?;

    if !cli.no_input {
        if console {
            OutputFormatter::info("Type 'p' + Enter to pause/resume, 'c' + Enter to cancel.");
        }
        spawn_control_reader(engine.clone());
    }

    let outcome = render_events(handle, run_log, console);

    if cli.json {
        let summary = RunSummary {
            strategy: request.strategy,
            source: request.source.clone(),
            destination: request.destination.clone(),
            extensions: request.extensions.iter().map(str::to_string).collect(),
            outcome: outcome.clone(),
            log_file,
        };
        let text = serde_json::to_string_pretty(&summary)
            .map_err(|e| format!("Error serializing summary: {}", e))?;
        println!("{}", text);
    } else {
        report_outcome(&outcome, log_file.as_deref());
    }

    Ok(outcome.exit_code())
}

/// Resolves the run request from flags, falling back to configuration.
pub fn build_request(cli: &Cli, config: &OrganizerConfig) -> Result<TransferRequest, String> {
    let mut entries: Vec<String> = cli.extensions.clone();
    for preset in &cli.preset {
        entries.extend(preset.extensions().iter().map(|e| e.to_string()));
    }
    if entries.is_empty() {
        entries = config.organize.extensions.clone();
    }

    let extensions = ExtensionSet::new(&entries).map_err(|e| format!("Error: {}", e))?;
    let strategy = cli
        .strategy
        .or(config.organize.strategy)
        .unwrap_or_default();

    let request = TransferRequest::new(&cli.source, &cli.destination, extensions, strategy);
    if config.filters.is_permissive() {
        return Ok(request);
    }

    let filters = config
        .filters
        .compile()
        .map_err(|e| format!("Error compiling filters: {}", e))?;
    Ok(request.with_filters(filters))
}

/// Lists what a run would copy without touching the filesystem.
fn dry_run(engine: &TransferEngine, request: &TransferRequest, as_json: bool) -> Result<i32, String> {
    let tasks = engine.plan(request).map_err(|e| format!("Error: {}", e))?;

    if as_json {
        let planned: Vec<_> = tasks
            .iter()
            .map(|task| {
                json!({
                    "source_path": task.source_path.to_string_lossy(),
                    "folder": folder_name(&task.extension),
                })
            })
            .collect();
        let text = serde_json::to_string_pretty(&planned)
            .map_err(|e| format!("Error serializing plan: {}", e))?;
        println!("{}", text);
        return Ok(0);
    }

    OutputFormatter::dry_run_notice(&format!(
        "Analyzing {} for {}",
        request.source.display(),
        request.extensions
    ));

    if tasks.is_empty() {
        OutputFormatter::plain("No matching files found.");
        return Ok(0);
    }

    let mut folder_counts: HashMap<String, usize> = HashMap::new();
    for task in &tasks {
        let folder = folder_name(&task.extension);
        OutputFormatter::plain(&format!(" - {}", task.source_path.display()));
        OutputFormatter::plain(&format!("   → Would copy to {}/", folder));
        *folder_counts.entry(folder).or_insert(0) += 1;
    }

    OutputFormatter::summary_table(&folder_counts, tasks.len());
    OutputFormatter::dry_run_notice("No files were copied.");
    Ok(0)
}

/// Consumes the run's events until it finishes, mirroring log lines into the
/// log file and the console.
fn render_events(handle: RunHandle, mut run_log: Option<RunLog>, console: bool) -> RunOutcome {
    let mut bar: Option<ProgressBar> = None;
    let mut log_failed = false;

    for event in handle.events() {
        match event {
            ProgressEvent::Log(line) => {
                if let Some(log) = run_log.as_mut() {
                    if let Err(e) = log.append(&line) {
                        if !log_failed {
                            OutputFormatter::warning(&format!("Could not write log file: {}", e));
                        }
                        log_failed = true;
                    }
                }
                if console {
                    OutputFormatter::log_line(&line, bar.as_ref());
                }
            }
            ProgressEvent::Counter { processed } => {
                if console {
                    bar.get_or_insert_with(OutputFormatter::create_counter_spinner)
                        .set_message(format!("{} files copied", processed));
                }
            }
            ProgressEvent::Progress {
                completed, total, ..
            } => {
                if console {
                    let pb = bar.get_or_insert_with(|| {
                        OutputFormatter::create_progress_bar(total as u64)
                    });
                    pb.set_length(total as u64);
                    pb.set_position(completed as u64);
                }
            }
            ProgressEvent::Finished(_) => break,
        }
    }

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    handle.wait()
}

fn report_outcome(outcome: &RunOutcome, log_file: Option<&std::path::Path>) {
    match outcome {
        RunOutcome::Completed { failed: 0, .. } => {
            OutputFormatter::success(&format!("Done: {}", outcome));
        }
        RunOutcome::Completed { .. } => {
            OutputFormatter::warning(&format!("Done: {}", outcome));
        }
        RunOutcome::NoMatches => OutputFormatter::warning("No matching files found."),
        RunOutcome::Cancelled { .. } => {
            OutputFormatter::warning(&format!("Cancelled: {}", outcome));
        }
        RunOutcome::PreconditionFailed { .. } | RunOutcome::Failed { .. } => {
            OutputFormatter::error(&outcome.to_string());
        }
    }

    if let Some(path) = log_file {
        OutputFormatter::plain(&format!("Log written to {}", path.display()));
    }
}

/// Control commands accepted on stdin while a run is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    TogglePause,
    Resume,
    Cancel,
}

impl ControlCommand {
    /// Parses one input line; unknown input yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "p" | "pause" => Some(Self::TogglePause),
            "r" | "resume" => Some(Self::Resume),
            "c" | "q" | "cancel" | "quit" => Some(Self::Cancel),
            _ => None,
        }
    }

    pub fn apply(self, engine: &TransferEngine) {
        match self {
            Self::TogglePause => {
                engine.toggle_pause();
            }
            Self::Resume => engine.resume(),
            Self::Cancel => engine.cancel(),
        }
    }
}

/// Reads control commands from stdin for the rest of the process.
fn spawn_control_reader(engine: TransferEngine) {
    let spawned = thread::Builder::new()
        .name("extsort-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if let Some(command) = ControlCommand::parse(&line) {
                    command.apply(&engine);
                }
            }
        });
    if let Err(e) = spawned {
        OutputFormatter::warning(&format!("Interactive control unavailable: {}", e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("extsort").chain(args.iter().copied()))
            .expect("arguments parse")
    }

    #[test]
    fn test_extensions_accept_commas_and_repeats() {
        let cli = parse(&["/in", "/out", "-e", "jpg,png", "--ext", "gif"]);
        assert_eq!(cli.extensions, vec!["jpg", "png", "gif"]);
        assert_eq!(cli.strategy, None);
    }

    #[test]
    fn test_strategy_and_preset_values() {
        let cli = parse(&["/in", "/out", "-s", "scan-first", "-p", "audio"]);
        assert_eq!(cli.strategy, Some(Strategy::ScanFirst));
        assert_eq!(cli.preset, vec![Preset::Audio]);
    }

    #[test]
    fn test_missing_destination_is_rejected() {
        assert!(Cli::try_parse_from(["extsort", "/in"]).is_err());
    }

    #[test]
    fn test_build_request_merges_presets_and_flags() {
        let cli = parse(&["/in", "/out", "-e", "heic", "-p", "archives"]);
        let request = build_request(&cli, &OrganizerConfig::default()).unwrap();

        assert!(request.extensions.contains(".heic"));
        assert!(request.extensions.contains(".zip"));
        assert_eq!(request.strategy, Strategy::Direct);
        assert!(request.filters.is_none());
    }

    #[test]
    fn test_build_request_falls_back_to_config() {
        let mut config = OrganizerConfig::default();
        config.organize.extensions = vec!["mp4".to_string()];
        config.organize.strategy = Some(Strategy::ScanFirst);
        config.filters.include_hidden = false;

        let cli = parse(&["/in", "/out"]);
        let request = build_request(&cli, &config).unwrap();

        assert_eq!(request.extensions.iter().collect::<Vec<_>>(), vec![".mp4"]);
        assert_eq!(request.strategy, Strategy::ScanFirst);
        assert!(request.filters.is_some());
    }

    #[test]
    fn test_build_request_without_extensions_fails() {
        let cli = parse(&["/in", "/out"]);
        let err = build_request(&cli, &OrganizerConfig::default()).unwrap_err();
        assert!(err.contains("No file types selected"));
    }

    #[test]
    fn test_control_command_parsing() {
        assert_eq!(ControlCommand::parse("p"), Some(ControlCommand::TogglePause));
        assert_eq!(ControlCommand::parse(" Resume \n"), Some(ControlCommand::Resume));
        assert_eq!(ControlCommand::parse("q"), Some(ControlCommand::Cancel));
        assert_eq!(ControlCommand::parse("x"), None);
    }

    #[test]
    fn test_control_commands_are_ignored_when_idle() {
        let engine = TransferEngine::new();
        ControlCommand::TogglePause.apply(&engine);
        assert!(!engine.is_paused());
        ControlCommand::Cancel.apply(&engine);
        assert!(!engine.is_processing());
    }
}
