//! Progress output for operators
//!
//! Separate from `tracing`: this is the product's own stdout, written as
//! `step:` lines, `•` dots while waiting, and plain lines.

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

struct Inner {
    out: Box<dyn Write + Send>,
    newline_pending: bool,
}

pub struct Logger {
    inner: Mutex<Inner>,
}

impl Logger {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            inner: Mutex::new(Inner {
                out: Box::new(out),
                newline_pending: false,
            }),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    fn emit(&self, text: &str, pending_after: bool) {
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut buf = String::new();
        if inner.newline_pending && !pending_after {
            buf.push('\n');
        }
        buf.push_str(text);
        // stdout may already be closed
        let _ = inner.out.write_all(buf.as_bytes());
        let _ = inner.out.flush();
        inner.newline_pending = pending_after;
    }

    pub fn step(&self, msg: &str) {
        self.emit(&format!("step: {}\n", msg), false);
    }

    pub fn dot(&self) {
        self.emit("•", true);
    }

    pub fn println(&self, msg: &str) {
        self.emit(&format!("{}\n", msg), false);
    }

    pub fn newline_pending(&self) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.newline_pending)
            .unwrap_or(false)
    }

    /// Ask a yes/no question on stdin; anything but `y`/`yes` declines
    pub fn prompt(&self, question: &str) -> bool {
        self.emit(&format!("{} (y/N): ", question.yellow()), false);
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

/// In-memory sink whose contents can be read while a [`Logger`] owns a clone
#[cfg(test)]
#[derive(Clone, Default)]
pub struct Buffer(std::sync::Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl Buffer {
    pub fn contents(&self) -> String {
        self.0
            .lock()
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
impl Write for Buffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("buffer poisoned"))?
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
