pub mod config;
pub mod engine;
pub mod error;
pub mod rules;
pub mod scanner;
pub mod stylesheet;
pub mod values;

pub use error::{Error, Result};

use crate::config::{Config, DEFAULT_CONFIG_PATH, DEFAULT_CONFIG_TOML, OutputConfig};
use crate::rules::RuleTable;
use crate::scanner::{ScanOptions, has_extension, is_hidden};
use crate::stylesheet::Header;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{RecvTimeoutError, channel};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const TOOL_NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");
const IDLE_WAIT: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Init {
        config: Option<String>,
    },
    Generate {
        config: Option<String>,
        minify: bool,
    },
    Watch {
        config: Option<String>,
        poll: bool,
        poll_interval_ms: u64,
    },
    Scan {
        config: Option<String>,
    },
    Help,
    Version,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CliError {
    pub message: String,
}

impl From<Error> for CliError {
    fn from(err: Error) -> Self {
        CliError {
            message: err.to_string(),
        }
    }
}

pub fn run(command: Command) -> std::result::Result<(), CliError> {
    match command {
        Command::Init { config } => run_init(&config_path(config)),
        Command::Generate { config, minify } => {
            run_generate(&config_path(config), minify)?;
            Ok(())
        }
        Command::Watch {
            config,
            poll,
            poll_interval_ms,
        } => run_watch(&config_path(config), poll, poll_interval_ms),
        Command::Scan { config } => run_scan(&config_path(config)),
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Version => {
            println!("{} {}", TOOL_NAME, VERSION);
            Ok(())
        }
    }
}

pub fn run_from_env() -> std::result::Result<(), CliError> {
    let command = parse_args(env::args().skip(1))?;
    run(command)
}

pub fn parse_args<I>(args: I) -> std::result::Result<Command, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut iter = args.into_iter();
    let Some(cmd) = iter.next() else {
        return Ok(Command::Help);
    };

    match cmd.as_str() {
        "init" => parse_init_args(iter.collect()),
        "generate" => parse_generate_args(iter.collect()),
        "watch" => parse_watch_args(iter.collect()),
        "scan" => parse_scan_args(iter.collect()),
        "-h" | "--help" | "help" => Ok(Command::Help),
        "-V" | "--version" | "version" => Ok(Command::Version),
        _ => Err(CliError {
            message: format!("unknown command: {}", cmd),
        }),
    }
}

fn parse_init_args(args: Vec<String>) -> std::result::Result<Command, CliError> {
    let mut config = None;
    let mut idx = 0;

    while idx < args.len() {
        match args[idx].as_str() {
            "--config" | "-c" => {
                idx += 1;
                config = Some(flag_value(&args, idx, "init", "--config")?);
            }
            value => return Err(unexpected_argument("init", value)),
        }
        idx += 1;
    }

    Ok(Command::Init { config })
}

fn parse_generate_args(args: Vec<String>) -> std::result::Result<Command, CliError> {
    let mut config = None;
    let mut minify = false;
    let mut idx = 0;

    while idx < args.len() {
        match args[idx].as_str() {
            "--config" | "-c" => {
                idx += 1;
                config = Some(flag_value(&args, idx, "generate", "--config")?);
            }
            "--minify" => {
                minify = true;
            }
            "--poll" | "--poll-interval" => {
                return Err(CliError {
                    message: format!("{} is only supported with watch", args[idx]),
                });
            }
            value => return Err(unexpected_argument("generate", value)),
        }
        idx += 1;
    }

    Ok(Command::Generate { config, minify })
}

fn parse_watch_args(args: Vec<String>) -> std::result::Result<Command, CliError> {
    let mut config = None;
    let mut poll = false;
    let mut poll_interval_ms = 500;
    let mut idx = 0;

    while idx < args.len() {
        match args[idx].as_str() {
            "--config" | "-c" => {
                idx += 1;
                config = Some(flag_value(&args, idx, "watch", "--config")?);
            }
            "--poll" => {
                poll = true;
            }
            "--poll-interval" => {
                idx += 1;
                let value = flag_value(&args, idx, "watch", "--poll-interval")?;
                poll = true;
                poll_interval_ms = parse_u64_arg(&value, "--poll-interval")?;
            }
            value => return Err(unexpected_argument("watch", value)),
        }
        idx += 1;
    }

    Ok(Command::Watch {
        config,
        poll,
        poll_interval_ms,
    })
}

fn parse_scan_args(args: Vec<String>) -> std::result::Result<Command, CliError> {
    let mut config = None;
    let mut idx = 0;

    while idx < args.len() {
        match args[idx].as_str() {
            "--config" | "-c" => {
                idx += 1;
                config = Some(flag_value(&args, idx, "scan", "--config")?);
            }
            value => return Err(unexpected_argument("scan", value)),
        }
        idx += 1;
    }

    Ok(Command::Scan { config })
}

fn flag_value(
    args: &[String],
    idx: usize,
    command: &str,
    flag: &str,
) -> std::result::Result<String, CliError> {
    args.get(idx).cloned().ok_or_else(|| CliError {
        message: format!("{} requires a value for {}", command, flag),
    })
}

fn unexpected_argument(command: &str, value: &str) -> CliError {
    CliError {
        message: format!("{} does not accept argument '{}'", command, value),
    }
}

fn parse_u64_arg(value: &str, flag: &str) -> std::result::Result<u64, CliError> {
    match value.parse::<u64>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(CliError {
            message: format!("{} requires a positive integer, got '{}'", flag, value),
        }),
    }
}

fn config_path(config: Option<String>) -> PathBuf {
    PathBuf::from(config.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()))
}

fn print_help() {
    println!("{} {}", TOOL_NAME, VERSION);
    println!();
    println!("USAGE:");
    println!("  {} init [--config <path>]", TOOL_NAME);
    println!("  {} generate [--config <path>] [--minify]", TOOL_NAME);
    println!(
        "  {} watch [--config <path>] [--poll] [--poll-interval <ms>]",
        TOOL_NAME
    );
    println!("  {} scan [--config <path>]", TOOL_NAME);
    println!();
    println!("EXAMPLES:");
    println!("  {} init", TOOL_NAME);
    println!("  {} generate -c {} --minify", TOOL_NAME, DEFAULT_CONFIG_PATH);
    println!("  {} watch --poll --poll-interval 250", TOOL_NAME);
}

fn run_init(path: &Path) -> std::result::Result<(), CliError> {
    if path.exists() {
        warn!(path = %path.display(), "config file already exists, leaving it untouched");
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
    }
    fs::write(path, DEFAULT_CONFIG_TOML).map_err(|err| Error::io(path, err))?;
    info!(path = %path.display(), "wrote default config");
    Ok(())
}

fn run_scan(path: &Path) -> std::result::Result<(), CliError> {
    let config = config::load_or_default(path)?;
    let result = scanner::scan(&ScanOptions::from_config(&config))?;

    for class in &result.classes {
        println!("{}", class);
    }

    info!(
        files = result.files_scanned,
        classes = result.classes.len(),
        "scan finished"
    );
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationStats {
    pub files_scanned: usize,
    pub total: usize,
    pub processed: usize,
    pub unprocessed: usize,
}

impl GenerationStats {
    pub fn processed_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.processed as f64 * 100.0 / self.total as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub css: String,
    pub stats: GenerationStats,
}

pub fn build_stylesheet(config: &Config, header: &Header) -> Result<Generated> {
    let resolved = config.resolve()?;
    let table = RuleTable::with_user_rules(&resolved, &config.rules)?;
    debug!(rules = table.len(), "built rule table");

    let scan = scanner::scan(&ScanOptions::from_config(config))?;
    let resolution = engine::resolve(&scan.classes, &table, &resolved)?;
    let css = stylesheet::render(&resolution, &resolved.output, header);

    Ok(Generated {
        css,
        stats: GenerationStats {
            files_scanned: scan.files_scanned,
            total: resolution.total(),
            processed: resolution.resolved.len(),
            unprocessed: resolution.unresolved.len(),
        },
    })
}

fn run_generate(path: &Path, minify: bool) -> Result<GenerationStats> {
    let mut config = config::load_or_default(path)?;
    if minify {
        config.output.minify = true;
    }

    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let header = Header::new(TOOL_NAME, VERSION).with_timestamp(timestamp);
    let generated = build_stylesheet(&config, &header)?;
    let out_path = write_output(&config.output, generated.css)?;

    let stats = generated.stats;
    info!(
        output = %out_path.display(),
        files = stats.files_scanned,
        total = stats.total,
        processed = stats.processed,
        unprocessed = stats.unprocessed,
        percent = %format!("{:.1}", stats.processed_percent()),
        "generated stylesheet"
    );
    Ok(stats)
}

fn write_output(output: &OutputConfig, mut css: String) -> Result<PathBuf> {
    let path = output.file_path();
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
    }

    if output.source_map {
        let file_name = format!("{}{}", output.file_name, output.extension);
        let map_name = format!("{}.map", file_name);
        let map = serde_json::json!({
            "version": 3,
            "file": file_name,
            "sources": [],
            "names": [],
            "mappings": "",
        });
        write_atomic(&path.with_file_name(&map_name), &map.to_string())?;
        css.push_str(&format!("/*# sourceMappingURL={} */\n", map_name));
    }

    write_atomic(&path, &css)?;
    Ok(path)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    fs::write(&tmp, contents).map_err(|err| Error::io(&tmp, err))?;
    fs::rename(&tmp, path).map_err(|err| Error::io(path, err))
}

fn run_watch(path: &Path, poll: bool, poll_interval_ms: u64) -> std::result::Result<(), CliError> {
    run_generate(path, false)?;

    let config = config::load_or_default(path)?;
    let filter = EventFilter::new(&config);
    if filter.roots.is_empty() {
        return Err(CliError {
            message: "none of the configured watch_dirs exist".to_string(),
        });
    }

    let (tx, rx) = channel();
    let mut watcher: Box<dyn Watcher> = if poll {
        Box::new(
            notify::PollWatcher::new(
                tx,
                notify::Config::default()
                    .with_poll_interval(Duration::from_millis(poll_interval_ms)),
            )
            .map_err(|err| Error::Watch(format!("failed to start poll watcher: {}", err)))?,
        )
    } else {
        Box::new(
            notify::recommended_watcher(tx)
                .map_err(|err| Error::Watch(format!("failed to start watcher: {}", err)))?,
        )
    };

    for root in &filter.roots {
        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|err| Error::Watch(format!("failed to watch {}: {}", root.display(), err)))?;
    }
    info!(
        dirs = filter.roots.len(),
        polling = poll,
        "watching for changes (press Ctrl+C to stop)"
    );

    let debounce = Duration::from_millis(config.debounce_ms);
    let mut deadline: Option<Instant> = None;
    loop {
        let wait = deadline
            .map(|at| at.saturating_duration_since(Instant::now()))
            .unwrap_or(IDLE_WAIT);
        match rx.recv_timeout(wait) {
            Ok(Ok(event)) => {
                if filter.is_relevant(&event) {
                    debug!(paths = ?event.paths, "change queued");
                    deadline = Some(Instant::now() + debounce);
                }
            }
            Ok(Err(err)) => warn!(error = %err, "watch error"),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if deadline.is_some_and(|at| Instant::now() >= at) {
            deadline = None;
            info!("change detected, regenerating");
            if let Err(err) = run_generate(path, false) {
                error!(error = %err, "generation failed");
            }
        }
    }

    Ok(())
}

struct EventFilter {
    roots: Vec<PathBuf>,
    extensions: Vec<String>,
    output: PathBuf,
}

impl EventFilter {
    fn new(config: &Config) -> Self {
        let roots = config
            .watch_dirs
            .iter()
            .map(PathBuf::from)
            .filter(|dir| {
                let exists = dir.is_dir();
                if !exists {
                    warn!(dir = %dir.display(), "watch dir does not exist");
                }
                exists
            })
            .map(|dir| absolute(&dir))
            .collect();
        Self {
            roots,
            extensions: config.extensions.clone(),
            output: absolute(&config.output.file_path()),
        }
    }

    fn is_relevant(&self, event: &Event) -> bool {
        if matches!(event.kind, EventKind::Access(_)) {
            return false;
        }
        event.paths.iter().any(|path| self.is_relevant_path(path))
    }

    fn is_relevant_path(&self, path: &Path) -> bool {
        let path = absolute(path);
        if path == self.output || !has_extension(&path, &self.extensions) {
            return false;
        }
        let relative = self
            .roots
            .iter()
            .find_map(|root| path.strip_prefix(root).ok());
        match relative {
            Some(relative) => !is_hidden(relative),
            None => path
                .file_name()
                .is_some_and(|name| !name.to_string_lossy().starts_with('.')),
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
