#![allow(dead_code)]

use std::path::PathBuf;

use replit::cli::{CliArgs, LogLevel};

/// Builder for `CliArgs` so tests do not depend on clap parsing.
pub struct CliArgsBuilder {
    args: CliArgs,
}

impl CliArgsBuilder {
    pub fn new(lang: &str) -> Self {
        Self {
            args: CliArgs {
                lang: lang.to_string(),
                file: None,
                directory: None,
                config: None,
                stale_after: None,
                use_hash: false,
                no_editor: true,
                log_level: None,
            },
        }
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.args.file = Some(path.into());
        self
    }

    pub fn directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.args.directory = Some(path.into());
        self
    }

    pub fn config(mut self, path: impl Into<PathBuf>) -> Self {
        self.args.config = Some(path.into());
        self
    }

    pub fn stale_after(mut self, value: &str) -> Self {
        self.args.stale_after = Some(value.to_string());
        self
    }

    pub fn use_hash(mut self) -> Self {
        self.args.use_hash = true;
        self
    }

    /// Builders default to `--no-editor`; this turns editor launch back on.
    pub fn with_editor(mut self) -> Self {
        self.args.no_editor = false;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.args.log_level = Some(level);
        self
    }

    pub fn build(self) -> CliArgs {
        self.args
    }
}
