//! Command log and progress output.
//!
//! Every pipeline step reports through one process-wide logger printing to
//! stderr. A progress line is redrawn in place; any other entry first ends
//! the open progress line so the two never share a line.

use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

/// Log level for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
    /// Row counter, redrawn in place
    Progress,
}

/// A single log entry
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Optional indentation level (for nested logs)
    pub indent: u8,
}

impl LogEntry {
    fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            indent: 0,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    pub fn progress(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Progress, message)
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }
}

/// Global logger
pub static LOGGER: Lazy<Logger> = Lazy::new(Logger::new);

/// Prints log entries, keeping track of an open progress line
pub struct Logger {
    progress_open: AtomicBool,
}

impl Logger {
    pub fn new() -> Self {
        Self {
            progress_open: AtomicBool::new(false),
        }
    }

    /// Print an entry to stderr
    pub fn log(&self, entry: LogEntry) {
        let mut stderr = io::stderr().lock();
        // write errors on stderr are ignored
        let _ = self.write_entry(&mut stderr, &entry);
    }

    /// End the open progress line on stderr, if any
    pub fn end_progress(&self) {
        let mut stderr = io::stderr().lock();
        let _ = self.close_progress(&mut stderr);
    }

    pub fn write_entry<W: Write>(&self, out: &mut W, entry: &LogEntry) -> io::Result<()> {
        let indent = "   ".repeat(entry.indent as usize);

        if entry.level == LogLevel::Progress {
            write!(out, "\r{}   {}", indent, entry.message)?;
            self.progress_open.store(true, Ordering::SeqCst);
            return out.flush();
        }

        self.close_progress(out)?;
        let prefix = match entry.level {
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
            _ => "   ",
        };
        writeln!(out, "{}{} {}", indent, prefix, entry.message)
    }

    fn close_progress<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if self.progress_open.swap(false, Ordering::SeqCst) {
            writeln!(out)?;
        }
        Ok(())
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

pub fn log_info(msg: impl Into<String>) {
    LOGGER.log(LogEntry::info(msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOGGER.log(LogEntry::success(msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOGGER.log(LogEntry::warning(msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOGGER.log(LogEntry::error(msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    LOGGER.log(LogEntry::info(msg).with_indent(indent));
}

/// Per-row progress counter: `label - current/total`.
pub struct Progress {
    label: String,
    current: usize,
    total: usize,
}

impl Progress {
    pub fn new(label: impl Into<String>, total: usize) -> Self {
        Self {
            label: label.into(),
            current: 0,
            total,
        }
    }

    /// Count one processed row.
    pub fn tick(&mut self) {
        self.current += 1;
        LOGGER.log(LogEntry::progress(self.message()));
        if self.current == self.total {
            LOGGER.end_progress();
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    fn message(&self) -> String {
        format!("{} - {}/{}", self.label, self.current, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(logger: &Logger, entries: &[LogEntry]) -> String {
        let mut out = Vec::new();
        for entry in entries {
            logger.write_entry(&mut out, entry).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_levels_and_indent() {
        let logger = Logger::new();
        let out = render(
            &logger,
            &[
                LogEntry::success("done"),
                LogEntry::info("file a.png").with_indent(1),
            ],
        );

        assert_eq!(out, "   ✓ done\n       file a.png\n");
    }

    #[test]
    fn test_progress_redraws_in_place() {
        let logger = Logger::new();
        let out = render(
            &logger,
            &[LogEntry::progress("rows - 1/2"), LogEntry::progress("rows - 2/2")],
        );

        assert_eq!(out, "\r   rows - 1/2\r   rows - 2/2");
    }

    #[test]
    fn test_entry_after_progress_starts_new_line() {
        let logger = Logger::new();
        let out = render(
            &logger,
            &[
                LogEntry::progress("rows - 1/3"),
                LogEntry::info("file a.png -> 1-2-a.png").with_indent(1),
                LogEntry::progress("rows - 2/3"),
            ],
        );

        assert_eq!(
            out,
            "\r   rows - 1/3\n       file a.png -> 1-2-a.png\n\r   rows - 2/3"
        );
    }

    #[test]
    fn test_closed_progress_adds_no_blank_line() {
        let logger = Logger::new();
        let mut out = Vec::new();
        logger.write_entry(&mut out, &LogEntry::progress("rows - 1/1")).unwrap();
        logger.close_progress(&mut out).unwrap();
        logger.write_entry(&mut out, &LogEntry::success("ok")).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "\r   rows - 1/1\n   ✓ ok\n");
    }

    #[test]
    fn test_progress_counts_rows() {
        let mut progress = Progress::new("rows", 2);
        progress.tick();
        assert_eq!(progress.message(), "rows - 1/2");
        progress.tick();
        assert_eq!(progress.current(), 2);
    }
}
