// src/config/model.rs

use serde::Deserialize;

use crate::types::DirectoryScan;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [run]
/// stale_after = "2s"
/// kill_grace = "500ms"
/// use_hash = false
///
/// [watch]
/// command = "entr"
/// args = ["-npz", "true"]
/// exclude = [".git/**"]
/// scan = "rescan"
///
/// [editor]
/// command = "code"
/// ```
///
/// All sections are optional and have reasonable defaults. Values given on
/// the command line take precedence over the file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    /// Run scheduling knobs from `[run]`.
    #[serde(default)]
    pub run: RunSection,

    /// External watch utility invocation from `[watch]`.
    #[serde(default)]
    pub watch: WatchSection,

    /// Editor fallback from `[editor]`.
    #[serde(default)]
    pub editor: EditorSection,
}

/// `[run]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    /// A run still active this long after it started is killed when a new
    /// change arrives.
    #[serde(default = "default_stale_after")]
    pub stale_after: String,

    /// How long a killed process gets between SIGTERM and SIGKILL.
    #[serde(default = "default_kill_grace")]
    pub kill_grace: String,

    /// Only run when the watched files' contents changed.
    #[serde(default)]
    pub use_hash: bool,
}

fn default_stale_after() -> String {
    "2s".to_string()
}

fn default_kill_grace() -> String {
    "500ms".to_string()
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            stale_after: default_stale_after(),
            kill_grace: default_kill_grace(),
            use_hash: false,
        }
    }
}

/// `[watch]` section.
///
/// The watch utility is spawned once per cycle with the watched paths on its
/// stdin (newline-joined); it must block until one of them changes and then
/// exit successfully.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    #[serde(default = "default_watch_command")]
    pub command: String,

    #[serde(default = "default_watch_args")]
    pub args: Vec<String>,

    /// Glob patterns (relative to the watched directory) excluded from
    /// directory enumeration.
    #[serde(default = "default_watch_exclude")]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub scan: DirectoryScan,

    /// Consecutive watch-utility failures tolerated before the watch loop
    /// gives up.
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,

    #[serde(default = "default_retry_backoff")]
    pub retry_backoff: String,
}

fn default_watch_command() -> String {
    "entr".to_string()
}

fn default_watch_args() -> Vec<String> {
    // -n: no TTY, -p: wait for the first change, -z: exit after running.
    vec!["-npz".to_string(), "true".to_string()]
}

fn default_watch_exclude() -> Vec<String> {
    vec![".git/**".to_string()]
}

fn default_max_failures() -> u32 {
    5
}

fn default_retry_backoff() -> String {
    "1s".to_string()
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            command: default_watch_command(),
            args: default_watch_args(),
            exclude: default_watch_exclude(),
            scan: DirectoryScan::default(),
            max_failures: default_max_failures(),
            retry_backoff: default_retry_backoff(),
        }
    }
}

/// `[editor]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct EditorSection {
    /// Editor used when `$VISUAL` is unset. Defaults to `code`.
    #[serde(default)]
    pub command: Option<String>,

    /// Set to `false` to never launch an editor.
    #[serde(default = "default_launch")]
    pub launch: bool,
}

fn default_launch() -> bool {
    true
}

impl Default for EditorSection {
    fn default() -> Self {
        Self {
            command: None,
            launch: default_launch(),
        }
    }
}
