// src/config/validate.rs

//! Turn CLI arguments + config file + environment into a validated
//! [`SessionConfig`].
//!
//! Everything that can make a session impossible is checked here, before any
//! file is created or process spawned:
//! - the interpreter must be on `PATH`,
//! - the watched directory must exist and be a directory,
//! - the editor (unless disabled) must be on `PATH`,
//! - the watch utility must be on `PATH`,
//! - durations and exclude globs must parse.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::cli::CliArgs;
use crate::config::duration::parse_duration;
use crate::config::model::ConfigFile;
use crate::errors::{ReplitError, Result};
use crate::types::DirectoryScan;
use crate::watch::listing::build_exclude_set;

/// Editor used when neither `$VISUAL` nor `[editor].command` is set.
pub const DEFAULT_EDITOR: &str = "code";

/// Process environment inputs that influence resolution.
#[derive(Debug, Clone)]
pub struct SessionEnv {
    /// Value of `$VISUAL`.
    pub visual: Option<String>,
    /// Working directory used for relative paths and as the default watch root.
    pub cwd: PathBuf,
}

impl SessionEnv {
    /// Capture the real process environment.
    pub fn from_process() -> Result<Self> {
        Ok(Self {
            visual: std::env::var("VISUAL").ok(),
            cwd: std::env::current_dir()?,
        })
    }
}

/// A resolved editor invocation (`$VISUAL` may carry arguments, e.g. `code -w`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// Run scheduling settings.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub stale_after: Duration,
    pub kill_grace: Duration,
    pub use_hash: bool,
}

/// Watch utility settings.
#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub exclude: Vec<String>,
    pub scan: DirectoryScan,
    pub max_failures: u32,
    pub retry_backoff: Duration,
}

/// Fully validated session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The language name as typed by the user (used for the shebang line).
    pub language: String,
    /// Absolute path of the interpreter executable.
    pub interpreter: PathBuf,
    /// User-supplied target file, if any (absolute).
    pub file: Option<PathBuf>,
    /// Directory watched in directory mode (absolute).
    pub directory: PathBuf,
    /// `None` when editor launch is disabled.
    pub editor: Option<EditorCommand>,
    pub run: RunSettings,
    pub watch: WatchSettings,
}

/// Resolve and validate a session.
pub fn resolve_session(args: &CliArgs, file_cfg: ConfigFile, env: &SessionEnv) -> Result<SessionConfig> {
    let interpreter = which::which(&args.lang)
        .map_err(|_| ReplitError::InterpreterNotFound(args.lang.clone()))?;

    let directory = resolve_directory(args.directory.as_deref(), &env.cwd)?;

    let file = args.file.as_ref().map(|f| absolutize(f, &env.cwd));

    let editor = if args.no_editor || !file_cfg.editor.launch {
        None
    } else {
        Some(resolve_editor(
            env.visual.as_deref(),
            file_cfg.editor.command.as_deref(),
        )?)
    };

    let run = resolve_run_settings(args, &file_cfg)?;
    let watch = resolve_watch_settings(&file_cfg)?;

    debug!(
        interpreter = %interpreter.display(),
        directory = %directory.display(),
        editor = ?editor,
        "session configuration resolved"
    );

    Ok(SessionConfig {
        language: args.lang.clone(),
        interpreter,
        file,
        directory,
        editor,
        run,
        watch,
    })
}

/// Pick the user's preferred editor: `$VISUAL`, then the configured
/// fallback, then [`DEFAULT_EDITOR`]. The command must be on `PATH`.
pub fn resolve_editor(visual: Option<&str>, configured: Option<&str>) -> Result<EditorCommand> {
    let raw = visual
        .filter(|v| !v.trim().is_empty())
        .or(configured.filter(|c| !c.trim().is_empty()))
        .unwrap_or(DEFAULT_EDITOR);

    let mut parts = raw.split_whitespace();
    let name = parts.next().unwrap_or(DEFAULT_EDITOR);
    let args = parts.map(str::to_string).collect();

    let program = which::which(name).map_err(|_| ReplitError::EditorNotFound(name.to_string()))?;

    Ok(EditorCommand { program, args })
}

fn resolve_directory(dir: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    let dir = match dir {
        Some(d) => absolutize(d, cwd),
        None => cwd.to_path_buf(),
    };

    if !dir.is_dir() {
        return Err(ReplitError::InvalidDirectory(dir));
    }
    Ok(dir)
}

fn resolve_run_settings(args: &CliArgs, cfg: &ConfigFile) -> Result<RunSettings> {
    let stale_src = args
        .stale_after
        .as_deref()
        .unwrap_or(cfg.run.stale_after.as_str());

    Ok(RunSettings {
        stale_after: duration_field("run.stale_after", stale_src)?,
        kill_grace: duration_field("run.kill_grace", &cfg.run.kill_grace)?,
        use_hash: args.use_hash || cfg.run.use_hash,
    })
}

fn resolve_watch_settings(cfg: &ConfigFile) -> Result<WatchSettings> {
    let section = &cfg.watch;

    if section.max_failures == 0 {
        return Err(ReplitError::ConfigError(
            "[watch].max_failures must be >= 1 (got 0)".to_string(),
        ));
    }

    build_exclude_set(&section.exclude)
        .map_err(|e| ReplitError::ConfigError(format!("[watch].exclude: {e:#}")))?;

    let program = which::which(&section.command)
        .map_err(|_| ReplitError::WatchUtilityNotFound(section.command.clone()))?;

    Ok(WatchSettings {
        program,
        args: section.args.clone(),
        exclude: section.exclude.clone(),
        scan: section.scan,
        max_failures: section.max_failures,
        retry_backoff: duration_field("watch.retry_backoff", &section.retry_backoff)?,
    })
}

fn duration_field(name: &str, value: &str) -> Result<Duration> {
    parse_duration(value).map_err(|e| ReplitError::ConfigError(format!("{name}: {e}")))
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
