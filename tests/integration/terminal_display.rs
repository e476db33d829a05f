// tests/integration/terminal_display.rs

use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use replit::display::terminal::to_crlf;
use replit::display::{DisplaySink, RunStatus, TerminalDisplay};
use replit::types::OutputStream;

/// Writer whose bytes stay readable after being handed to the display.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn display() -> (TerminalDisplay, SharedBuffer) {
    let buf = SharedBuffer::default();
    let display = TerminalDisplay::with_writer(
        Path::new("/tmp/replit123"),
        "python3",
        Box::new(buf.clone()),
    );
    (display, buf)
}

#[test]
fn bare_line_feeds_become_crlf() {
    assert_eq!(&*to_crlf(b"a\nb\n"), b"a\r\nb\r\n");
    assert_eq!(&*to_crlf(b"\n"), b"\r\n");
    assert_eq!(&*to_crlf(b"already\r\n"), b"already\r\n");
    assert_eq!(&*to_crlf(b"no newline"), b"no newline");
}

#[test]
fn header_names_target_language_and_keys() {
    let (display, buf) = display();
    display.start();

    let text = buf.text();
    assert!(text.contains("/tmp/replit123"));
    assert!(text.contains("python3"));
    assert!(text.contains("k: kill run"));
    assert!(text.contains("Waiting for program execution..."));
}

#[test]
fn output_is_streamed_with_stderr_coloured() {
    let (display, buf) = display();
    display.clear();
    display.write(OutputStream::Stdout, b"out\n");
    display.write(OutputStream::Stderr, b"err\n");

    let text = buf.text();
    assert!(text.contains("out\r\n"));
    // Red foreground around the stderr chunk, then a reset.
    let out_end = text.find("out\r\n").unwrap() + "out\r\n".len();
    let err_at = text.find("err\r\n").unwrap();
    assert!(text[out_end..err_at].contains("\x1b[38;"));
    assert!(text[err_at..].contains("\x1b[0m"));
}

#[test]
fn footer_shows_statistics_except_while_running() {
    let (display, buf) = display();
    display.set_status(RunStatus::Running);
    display.refresh();
    assert!(!buf.text().contains("run 0 times"));

    display.set_run_count(3);
    display.set_run_duration(42);
    display.set_status(RunStatus::Exited(Some(0)));
    display.refresh();

    let text = buf.text();
    assert!(text.contains("run 3 times · 42ms · exit 0"));
}
