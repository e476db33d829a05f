// tests/integration/config_handling.rs

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::NamedTempFile;

use replit::cli::LogLevel;
use replit::config::loader::config_path;
use replit::config::{
    load_from_path, parse_duration, resolve_editor, resolve_session, ConfigFile, SessionEnv,
};
use replit::errors::ReplitError;
use replit::logging::resolve_level;
use replit::types::DirectoryScan;
use replit_test_utils::builders::CliArgsBuilder;

/// Defaults, except for a watch utility that exists everywhere.
fn portable_config() -> ConfigFile {
    let mut cfg = ConfigFile::default();
    cfg.watch.command = "sh".to_string();
    cfg
}

fn env_in(dir: &Path) -> SessionEnv {
    SessionEnv {
        visual: None,
        cwd: dir.to_path_buf(),
    }
}

#[test]
fn config_file_sections_are_all_optional() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "").unwrap();

    let cfg = load_from_path(file.path()).unwrap();

    assert_eq!(cfg.run.stale_after, "2s");
    assert_eq!(cfg.run.kill_grace, "500ms");
    assert!(!cfg.run.use_hash);
    assert_eq!(cfg.watch.command, "entr");
    assert_eq!(cfg.watch.args, vec!["-npz", "true"]);
    assert_eq!(cfg.watch.scan, DirectoryScan::Rescan);
    assert_eq!(cfg.watch.max_failures, 5);
    assert!(cfg.editor.launch);
    assert_eq!(cfg.editor.command, None);
}

#[test]
fn config_file_values_are_read() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[run]
stale_after = "750ms"
use_hash = true

[watch]
command = "sh"
args = ["-c", "cat"]
scan = "snapshot"
max_failures = 2

[editor]
command = "vim"
launch = false
"#
    )
    .unwrap();

    let cfg = load_from_path(file.path()).unwrap();

    assert_eq!(cfg.run.stale_after, "750ms");
    assert!(cfg.run.use_hash);
    assert_eq!(cfg.watch.args, vec!["-c", "cat"]);
    assert_eq!(cfg.watch.scan, DirectoryScan::Snapshot);
    assert_eq!(cfg.watch.max_failures, 2);
    assert_eq!(cfg.editor.command.as_deref(), Some("vim"));
    assert!(!cfg.editor.launch);
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[run\nstale_after = ").unwrap();

    match load_from_path(file.path()) {
        Err(ReplitError::TomlError(_)) => {}
        other => panic!("expected TomlError, got {other:?}"),
    }
}

#[test]
fn unknown_scan_mode_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[watch]\nscan = \"sometimes\"\n").unwrap();

    assert!(load_from_path(file.path()).is_err());
}

#[test]
fn cli_config_path_wins_over_environment() {
    let cli = PathBuf::from("/cli.toml");
    assert_eq!(
        config_path(Some(cli.as_path()), Some(OsString::from("/env.toml"))),
        Some(cli)
    );
    assert_eq!(
        config_path(None, Some(OsString::from("/env.toml"))),
        Some(PathBuf::from("/env.toml"))
    );
    assert_eq!(config_path(None, Some(OsString::new())), None);
    assert_eq!(config_path(None, None), None);
}

#[test]
fn durations_parse_with_units() {
    assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
    assert_eq!(parse_duration("2s"), Ok(Duration::from_secs(2)));
    assert_eq!(parse_duration(" 1m "), Ok(Duration::from_secs(60)));
    assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
    assert!(parse_duration("").is_err());
    assert!(parse_duration("10").is_err());
    assert!(parse_duration("5 fortnights").is_err());
}

#[test]
fn oversized_durations_are_rejected_instead_of_overflowing() {
    let err = parse_duration("307445734561825861m").unwrap_err();
    assert!(err.contains("too large"), "unexpected error: {err}");
    assert!(parse_duration(&format!("{}h", u64::MAX)).is_err());
    assert_eq!(
        parse_duration(&format!("{}s", u64::MAX)),
        Ok(Duration::from_secs(u64::MAX))
    );
}

#[test]
fn oversized_stale_after_flag_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let args = CliArgsBuilder::new("sh")
        .stale_after("307445734561825861m")
        .build();

    assert!(resolve_session(&args, portable_config(), &env_in(dir.path())).is_err());
}

#[test]
fn log_level_priority() {
    assert_eq!(resolve_level(None, None), tracing::Level::WARN);
    assert_eq!(resolve_level(None, Some("debug")), tracing::Level::DEBUG);
    assert_eq!(resolve_level(None, Some("nonsense")), tracing::Level::WARN);
    assert_eq!(
        resolve_level(Some(LogLevel::Error), Some("debug")),
        tracing::Level::ERROR
    );
}

#[test]
fn session_resolves_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let args = CliArgsBuilder::new("sh").build();

    let session = resolve_session(&args, portable_config(), &env_in(dir.path())).unwrap();

    assert_eq!(session.language, "sh");
    assert!(session.interpreter.is_absolute());
    assert_eq!(session.directory, dir.path());
    assert_eq!(session.file, None);
    assert!(session.editor.is_none(), "builder disables the editor");
    assert_eq!(session.run.stale_after, Duration::from_secs(2));
    assert_eq!(session.run.kill_grace, Duration::from_millis(500));
    assert_eq!(session.watch.retry_backoff, Duration::from_secs(1));
}

#[test]
fn cli_flags_override_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let args = CliArgsBuilder::new("sh")
        .stale_after("100ms")
        .use_hash()
        .build();

    let session = resolve_session(&args, portable_config(), &env_in(dir.path())).unwrap();

    assert_eq!(session.run.stale_after, Duration::from_millis(100));
    assert!(session.run.use_hash);
}

#[test]
fn relative_file_and_directory_resolve_against_cwd() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("src")).unwrap();
    let args = CliArgsBuilder::new("sh")
        .file("main.sh")
        .directory("src")
        .build();

    let session = resolve_session(&args, portable_config(), &env_in(dir.path())).unwrap();

    assert_eq!(session.file, Some(dir.path().join("main.sh")));
    assert_eq!(session.directory, dir.path().join("src"));
}

#[test]
fn missing_interpreter_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let args = CliArgsBuilder::new("definitely-not-a-language-xyz").build();

    match resolve_session(&args, portable_config(), &env_in(dir.path())) {
        Err(ReplitError::InterpreterNotFound(name)) => {
            assert_eq!(name, "definitely-not-a-language-xyz")
        }
        other => panic!("expected InterpreterNotFound, got {other:?}"),
    }
}

#[test]
fn missing_directory_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let args = CliArgsBuilder::new("sh").directory("nope").build();

    match resolve_session(&args, portable_config(), &env_in(dir.path())) {
        Err(ReplitError::InvalidDirectory(path)) => assert_eq!(path, dir.path().join("nope")),
        other => panic!("expected InvalidDirectory, got {other:?}"),
    }
}

#[test]
fn missing_editor_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let args = CliArgsBuilder::new("sh").with_editor().build();
    let env = SessionEnv {
        visual: Some("no-such-editor-xyz --wait".to_string()),
        cwd: dir.path().to_path_buf(),
    };

    match resolve_session(&args, portable_config(), &env) {
        Err(ReplitError::EditorNotFound(name)) => assert_eq!(name, "no-such-editor-xyz"),
        other => panic!("expected EditorNotFound, got {other:?}"),
    }
}

#[test]
fn editor_disabled_in_config_is_not_required() {
    let dir = tempfile::tempdir().unwrap();
    let args = CliArgsBuilder::new("sh").with_editor().build();
    let env = SessionEnv {
        visual: Some("no-such-editor-xyz".to_string()),
        cwd: dir.path().to_path_buf(),
    };
    let mut cfg = portable_config();
    cfg.editor.launch = false;

    let session = resolve_session(&args, cfg, &env).unwrap();
    assert!(session.editor.is_none());
}

#[test]
fn editor_prefers_visual_and_keeps_its_arguments() {
    let editor = resolve_editor(Some("sh -x"), Some("definitely-missing")).unwrap();
    assert!(editor.program.ends_with("sh"));
    assert_eq!(editor.args, vec!["-x"]);

    let fallback = resolve_editor(Some("   "), Some("sh")).unwrap();
    assert!(fallback.program.ends_with("sh"));
    assert!(fallback.args.is_empty());
}

#[test]
fn missing_watch_utility_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let args = CliArgsBuilder::new("sh").build();
    let mut cfg = portable_config();
    cfg.watch.command = "no-such-watcher-xyz".to_string();

    match resolve_session(&args, cfg, &env_in(dir.path())) {
        Err(ReplitError::WatchUtilityNotFound(name)) => assert_eq!(name, "no-such-watcher-xyz"),
        other => panic!("expected WatchUtilityNotFound, got {other:?}"),
    }
}

#[test]
fn bad_values_are_configuration_errors() {
    let dir = tempfile::tempdir().unwrap();

    let args = CliArgsBuilder::new("sh").stale_after("soon").build();
    assert!(matches!(
        resolve_session(&args, portable_config(), &env_in(dir.path())),
        Err(ReplitError::ConfigError(_))
    ));

    let args = CliArgsBuilder::new("sh").build();
    let mut cfg = portable_config();
    cfg.watch.max_failures = 0;
    assert!(matches!(
        resolve_session(&args, cfg, &env_in(dir.path())),
        Err(ReplitError::ConfigError(_))
    ));

    let mut cfg = portable_config();
    cfg.watch.exclude = vec!["a/[".to_string()];
    assert!(matches!(
        resolve_session(&args, cfg, &env_in(dir.path())),
        Err(ReplitError::ConfigError(_))
    ));
}
