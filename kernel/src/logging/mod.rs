//! Unified logging subsystem
//!
//! This module provides the monitor's diagnostic logging, separate from the
//! console transcript the monitor prints for the user:
//! - **Log Levels**: ERROR, WARN, INFO, DEBUG, TRACE
//! - **Per-Module Filtering**: Different log levels for different modules
//! - **Runtime Configuration**: Change log levels via the `loglevel` command
//! - **Multiple Output Targets**: QEMU debug port, serial, both, or none
//! - **Allocation-Free**: Safe to use from trap and panic paths
//!
//! ## Usage
//!
//! ```ignore
//! use kmon_kernel::{log_debug, log_warn};
//!
//! log_debug!("dispatching '{}' with {} args", name, argc);
//! log_warn!("symbol lookup failed at {:#x}", rip);
//! ```
//!
//! ## Output Format
//!
//! - **INFO/WARN/ERROR**: `[LEVEL module] message`
//! - **DEBUG/TRACE**: `[LEVEL module::function@file:line] message`
//!
//! On bare metal the targets are I/O ports. Hosted builds have no ports, so
//! every target is routed to the sink installed with [`set_host_sink`] (and
//! dropped if none is installed).

mod filter;
mod output;

// Macros must be declared before they're used
#[macro_use]
pub mod macros;

pub use filter::{get_module_level, set_module_level, ModuleFilter};
pub use output::{get_output_target, set_host_sink, set_output_target, OutputTarget};

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

/// Log levels (ordered from most to least severe)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    /// Failures the monitor cannot recover from
    Error = 0,
    /// Conditions worth a look (bad arguments, aborted walks)
    Warn = 1,
    /// State changes such as page-table writes
    Info = 2,
    /// Dispatch decisions and intermediate values
    Debug = 3,
    /// Per-iteration detail (every page, every frame)
    Trace = 4,
}

impl LogLevel {
    /// Convert log level to string prefix
    pub const fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN ",
            LogLevel::Info => "INFO ",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    /// Parse a level name (case-insensitive, short forms accepted)
    pub fn parse(s: &str) -> Option<Self> {
        const NAMES: &[(&str, LogLevel)] = &[
            ("error", LogLevel::Error),
            ("err", LogLevel::Error),
            ("e", LogLevel::Error),
            ("warn", LogLevel::Warn),
            ("warning", LogLevel::Warn),
            ("w", LogLevel::Warn),
            ("info", LogLevel::Info),
            ("i", LogLevel::Info),
            ("debug", LogLevel::Debug),
            ("dbg", LogLevel::Debug),
            ("d", LogLevel::Debug),
            ("trace", LogLevel::Trace),
            ("trc", LogLevel::Trace),
            ("t", LogLevel::Trace),
        ];
        NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|&(_, level)| level)
    }

    pub(crate) const fn from_u8(val: u8) -> Self {
        match val {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            4 => LogLevel::Trace,
            _ => LogLevel::Info,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str().trim_end())
    }
}

/// Logging system initialization state
static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize the logging subsystem
///
/// Loads default levels and output targets from `config`. Idempotent.
pub fn init() {
    if LOGGING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    filter::init_default_filters();
    output::init_default_targets();
}

/// Whether a message at `level` from `module` would be emitted.
///
/// Lets the macros skip formatting entirely for filtered messages.
#[doc(hidden)]
pub fn enabled(level: LogLevel, module: &str) -> bool {
    filter::should_log(module, level) && output::get_output_target(level) != OutputTarget::None
}

/// Log a message (internal function used by macros)
///
/// # Arguments
/// * `level` - Log level
/// * `module` - Module path (from module_path!())
/// * `file` - Source file (from file!())
/// * `line` - Line number (from line!())
/// * `function` - Function name (only captured for DEBUG/TRACE)
/// * `message` - Pre-formatted message string
#[doc(hidden)]
pub fn log_impl(
    level: LogLevel,
    module: &str,
    file: &str,
    line: u32,
    function: Option<&str>,
    message: &str,
) {
    if !filter::should_log(module, level) {
        return;
    }

    let target = output::get_output_target(level);
    if target == OutputTarget::None {
        return;
    }

    let mut buf = [0u8; 512];
    let len = format_log_entry(&mut buf, level, module, file, line, function, message);
    output::write_bytes(target, &buf[..len]);
}

/// Format a log entry into a stack buffer
///
/// Format depends on log level:
/// - INFO/WARN/ERROR: `[LEVEL module] message\n`
/// - DEBUG/TRACE: `[LEVEL module::function@file:line] message\n`
///
/// Returns the number of bytes written. Overlong entries are truncated but
/// always keep their trailing newline.
fn format_log_entry(
    buf: &mut [u8],
    level: LogLevel,
    module: &str,
    file: &str,
    line: u32,
    function: Option<&str>,
    message: &str,
) -> usize {
    // Last byte is reserved for '\n'
    let limit = buf.len().saturating_sub(1);
    let mut w = EntryWriter { buf, pos: 0, limit };

    w.push(b"[");
    w.push(level.as_str().as_bytes());
    w.push(b" ");

    // "kmon_kernel::monitor::commands" -> "monitor::commands"
    let module_to_write = match module.find("::") {
        Some(idx) => &module[idx + 2..],
        None if module == "kmon_kernel" => "kmon",
        None => module,
    };
    w.push_limited(module_to_write.as_bytes(), 64);

    if level >= LogLevel::Debug {
        if let Some(func) = function {
            w.push(b"::");
            w.push_limited(func.as_bytes(), 32);
        }
        w.push(b"@");
        let filename = file.rsplit('/').next().unwrap_or(file);
        w.push_limited(filename.as_bytes(), 32);
        w.push(b":");
        let mut digits = [0u8; 10];
        let n = write_u32_decimal(&mut digits, line);
        w.push(&digits[..n]);
    }

    w.push(b"] ");
    w.push(message.as_bytes());

    let pos = w.pos;
    if pos < w.buf.len() {
        w.buf[pos] = b'\n';
        pos + 1
    } else {
        pos
    }
}

/// Bounded cursor over the entry buffer
struct EntryWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
    limit: usize,
}

impl EntryWriter<'_> {
    fn push(&mut self, bytes: &[u8]) {
        self.push_limited(bytes, usize::MAX);
    }

    fn push_limited(&mut self, bytes: &[u8], max: usize) {
        for &byte in bytes.iter().take(max) {
            if self.pos >= self.limit {
                return;
            }
            self.buf[self.pos] = byte;
            self.pos += 1;
        }
    }
}

/// Write a u32 as decimal ASCII into buffer
///
/// # Returns
/// Number of bytes written
fn write_u32_decimal(buf: &mut [u8], mut value: u32) -> usize {
    if value == 0 {
        if let Some(first) = buf.first_mut() {
            *first = b'0';
            return 1;
        }
        return 0;
    }

    // Build digits in reverse
    let mut digits = [0u8; 10];
    let mut count = 0;
    while value > 0 && count < 10 {
        digits[count] = b'0' + (value % 10) as u8;
        value /= 10;
        count += 1;
    }

    let count = count.min(buf.len());
    for i in 0..count {
        buf[i] = digits[count - 1 - i];
    }
    count
}

/// Fixed-buffer string writer (no heap allocation)
///
/// Used by the logging macros to format messages into a buffer on the
/// caller's stack. Output past the end of the buffer is silently dropped.
pub struct StackWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> StackWriter<'a> {
    /// Create a new writer over `buf`
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Get the written content as a string slice
    ///
    /// If truncation split a multi-byte character, the partial character is
    /// dropped.
    pub fn as_str(&self) -> &str {
        let written = &self.buf[..self.pos];
        match core::str::from_utf8(written) {
            Ok(s) => s,
            Err(e) => core::str::from_utf8(&written[..e.valid_up_to()]).unwrap_or(""),
        }
    }
}

impl fmt::Write for StackWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let remaining = self.buf.len() - self.pos;
        let to_write = bytes.len().min(remaining);

        self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
        self.pos += to_write;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;

    #[test]
    fn entry_format_short_levels() {
        let mut buf = [0u8; 128];
        let n = format_log_entry(
            &mut buf,
            LogLevel::Warn,
            "kmon_kernel::monitor",
            "kernel/src/monitor/mod.rs",
            42,
            None,
            "bad args",
        );
        assert_eq!(&buf[..n], b"[WARN  monitor] bad args\n");
    }

    #[test]
    fn entry_format_debug_includes_location() {
        let mut buf = [0u8; 128];
        let n = format_log_entry(
            &mut buf,
            LogLevel::Debug,
            "kmon_kernel::stack",
            "kernel/src/stack.rs",
            7,
            Some("next"),
            "fp=0x10",
        );
        assert_eq!(&buf[..n], b"[DEBUG stack::next@stack.rs:7] fp=0x10\n");
    }

    #[test]
    fn entry_truncates_but_keeps_newline() {
        let mut buf = [0u8; 16];
        let n = format_log_entry(
            &mut buf,
            LogLevel::Error,
            "kmon_kernel",
            "lib.rs",
            1,
            None,
            "a very long message that does not fit",
        );
        assert_eq!(n, 16);
        assert_eq!(buf[15], b'\n');
        assert!(buf.starts_with(b"[ERROR kmon] "));
    }

    #[test]
    fn stack_writer_drops_overflow() {
        let mut buf = [0u8; 8];
        let mut w = StackWriter::new(&mut buf);
        let _ = write!(w, "{}-{}", 1234, 56789);
        assert_eq!(w.as_str(), "1234-567");
    }

    #[test]
    fn stack_writer_never_splits_characters() {
        let mut buf = [0u8; 3];
        let mut w = StackWriter::new(&mut buf);
        let _ = w.write_str("aé!");
        assert_eq!(w.as_str(), "aé");
        let mut buf = [0u8; 2];
        let mut w = StackWriter::new(&mut buf);
        let _ = w.write_str("aé");
        assert_eq!(w.as_str(), "a");
    }

    #[test]
    fn level_names_parse() {
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("t"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse("loud"), None);
    }

    #[test]
    fn decimal_digits() {
        let mut buf = [0u8; 10];
        let n = write_u32_decimal(&mut buf, 4096);
        assert_eq!(&buf[..n], b"4096");
        let n = write_u32_decimal(&mut buf, 0);
        assert_eq!(&buf[..n], b"0");
    }
}
