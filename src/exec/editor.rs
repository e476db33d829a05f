// src/exec/editor.rs

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::{Child, Command};
use tracing::info;

use crate::config::EditorCommand;
use crate::exec::kill::{isolate_process_group, terminate};

/// The user's editor, retained only so it can be terminated at shutdown.
#[derive(Debug)]
pub struct EditorProcess {
    child: Child,
}

impl EditorProcess {
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Terminate the editor. A no-op if it already exited (e.g. `code`
    /// hands off to a running instance and returns immediately).
    pub async fn terminate(&mut self, grace: Duration) {
        terminate(&mut self.child, grace).await;
    }
}

/// Launch `<editor> [args] <target>` detached from the display's stdio.
pub fn launch_editor(editor: &EditorCommand, target: &Path) -> Result<EditorProcess> {
    let mut cmd = Command::new(&editor.program);
    cmd.args(&editor.args)
        .arg(target)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    isolate_process_group(&mut cmd);

    let child = cmd
        .spawn()
        .with_context(|| format!("launching editor {}", editor.program.display()))?;

    info!(
        pid = child.id(),
        editor = %editor.program.display(),
        target = %target.display(),
        "editor launched"
    );

    Ok(EditorProcess { child })
}
