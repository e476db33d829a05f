// src/display/terminal.rs

use std::borrow::Cow;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{Color, Print, PrintStyledContent, ResetColor, SetForegroundColor, Stylize};
use crossterm::terminal::{Clear, ClearType};
use tracing::debug;

use crate::display::{DisplaySink, RunStatus};
use crate::types::OutputStream;

const KEY_HELP: &str = "k: kill run · r: rerun · q: quit";

struct Screen {
    out: Box<dyn Write + Send>,
    run_count: u64,
    run_millis: u64,
    status: RunStatus,
    /// Whether the last output byte ended a line; keeps the footer on its own line.
    at_line_start: bool,
}

/// Streaming terminal renderer.
///
/// Layout per run: a header (title, target, language, key help), the raw
/// output (stderr tinted red), and a footer with run count, duration and
/// status written on every refresh.
///
/// Line feeds are written as CRLF so output stays aligned while the
/// keyboard listener holds the terminal in raw mode.
pub struct TerminalDisplay {
    target: String,
    language: String,
    screen: Mutex<Screen>,
}

impl std::fmt::Debug for TerminalDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalDisplay")
            .field("target", &self.target)
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

impl TerminalDisplay {
    pub fn new(target: &Path, language: &str) -> Self {
        Self::with_writer(target, language, Box::new(io::stdout()))
    }

    /// Render into `out` instead of stdout.
    pub fn with_writer(target: &Path, language: &str, out: Box<dyn Write + Send>) -> Self {
        Self {
            target: target.display().to_string(),
            language: language.to_string(),
            screen: Mutex::new(Screen {
                out,
                run_count: 0,
                run_millis: 0,
                status: RunStatus::Waiting,
                at_line_start: true,
            }),
        }
    }

    fn screen(&self) -> MutexGuard<'_, Screen> {
        self.screen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Draw the header and the "waiting" placeholder.
    pub fn start(&self) {
        let mut screen = self.screen();
        let res = self
            .draw_header(&mut screen.out)
            .and_then(|_| queue!(screen.out, Print("Waiting for program execution...\r\n")))
            .and_then(|_| screen.out.flush());
        report(res);
    }

    fn draw_header<W: Write>(&self, out: &mut W) -> io::Result<()> {
        queue!(
            out,
            Clear(ClearType::All),
            MoveTo(0, 0),
            PrintStyledContent("Replit".bold().red()),
            Print("  Edit "),
            PrintStyledContent(self.target.as_str().red()),
            Print(" & save to run with "),
            PrintStyledContent(self.language.as_str().red()),
            Print("\r\n"),
            PrintStyledContent(KEY_HELP.dim()),
            Print("\r\n\r\n"),
        )
    }
}

/// Expand bare `\n` to `\r\n`.
pub fn to_crlf(bytes: &[u8]) -> Cow<'_, [u8]> {
    let bare = bytes
        .iter()
        .enumerate()
        .any(|(i, b)| *b == b'\n' && (i == 0 || bytes[i - 1] != b'\r'));
    if !bare {
        return Cow::Borrowed(bytes);
    }

    let mut out = Vec::with_capacity(bytes.len() + bytes.len() / 8);
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'\n' && (i == 0 || bytes[i - 1] != b'\r') {
            out.push(b'\r');
        }
        out.push(*b);
    }
    Cow::Owned(out)
}

fn report(res: io::Result<()>) {
    if let Err(e) = res {
        debug!(error = %e, "terminal write failed");
    }
}

impl DisplaySink for TerminalDisplay {
    fn clear(&self) {
        let mut screen = self.screen();
        screen.at_line_start = true;
        let res = self
            .draw_header(&mut screen.out)
            .and_then(|_| screen.out.flush());
        report(res);
    }

    fn write(&self, stream: OutputStream, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let mut screen = self.screen();
        screen.at_line_start = bytes.ends_with(b"\n");

        let text = to_crlf(bytes);
        let out = &mut screen.out;
        let res = match stream {
            OutputStream::Stdout => out.write_all(&text),
            OutputStream::Stderr => queue!(out, SetForegroundColor(Color::Red))
                .and_then(|_| out.write_all(&text))
                .and_then(|_| queue!(out, ResetColor)),
        };
        report(res.and_then(|_| out.flush()));
    }

    fn set_run_count(&self, count: u64) {
        self.screen().run_count = count;
    }

    fn set_run_duration(&self, millis: u64) {
        self.screen().run_millis = millis;
    }

    fn set_status(&self, status: RunStatus) {
        self.screen().status = status;
    }

    fn refresh(&self) {
        let mut screen = self.screen();
        if screen.status == RunStatus::Running {
            return;
        }

        let footer = format!(
            "── run {} times · {}ms · {} ──",
            screen.run_count, screen.run_millis, screen.status
        );
        let lead = if screen.at_line_start { "\r\n" } else { "\r\n\r\n" };
        let out = &mut screen.out;
        let res = queue!(out, Print(lead), PrintStyledContent(footer.dim()), Print("\r\n"))
            .and_then(|_| out.flush());
        report(res);
        screen.at_line_start = true;
    }
}
