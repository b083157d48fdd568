//! Log output target management
//!
//! This module manages where log messages are sent:
//! - QEMU debug port (0xE9) - for development/debugging
//! - Serial port (COM1) - for logging on real hardware
//! - Both targets
//! - None - to disable output for a specific level
//!
//! Targets are configured per log level. Port I/O only exists on bare metal
//! (`target_os = "none"`); hosted builds forward every non-`None` target to the
//! sink registered with [`set_host_sink`].

use super::LogLevel;
use core::sync::atomic::{AtomicU8, Ordering};

/// Output target for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputTarget {
    /// No output (discard the message)
    None = 0,
    /// QEMU debug port (0xE9) only
    QemuDebug = 1,
    /// Serial port (COM1) only
    Serial = 2,
    /// Both QEMU debug and serial
    Both = 3,
}

impl OutputTarget {
    /// Parse a target name
    pub fn parse(s: &str) -> Option<Self> {
        const NAMES: &[(&str, OutputTarget)] = &[
            ("none", OutputTarget::None),
            ("off", OutputTarget::None),
            ("qemu", OutputTarget::QemuDebug),
            ("debug", OutputTarget::QemuDebug),
            ("serial", OutputTarget::Serial),
            ("com1", OutputTarget::Serial),
            ("both", OutputTarget::Both),
            ("all", OutputTarget::Both),
        ];
        NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|&(_, target)| target)
    }

    /// Convert to string
    pub const fn as_str(&self) -> &'static str {
        match self {
            OutputTarget::None => "none",
            OutputTarget::QemuDebug => "qemu",
            OutputTarget::Serial => "serial",
            OutputTarget::Both => "both",
        }
    }

    const fn from_u8(val: u8) -> Self {
        match val {
            1 => OutputTarget::QemuDebug,
            2 => OutputTarget::Serial,
            3 => OutputTarget::Both,
            _ => OutputTarget::None,
        }
    }
}

/// Output target for each log level, indexed by `LogLevel as usize`.
static OUTPUT_TARGETS: [AtomicU8; 5] = [
    AtomicU8::new(OutputTarget::Both as u8),
    AtomicU8::new(OutputTarget::Both as u8),
    AtomicU8::new(OutputTarget::QemuDebug as u8),
    AtomicU8::new(OutputTarget::QemuDebug as u8),
    AtomicU8::new(OutputTarget::QemuDebug as u8),
];

/// Sink for hosted builds where there are no I/O ports to write to
static HOST_SINK: spin::Once<fn(&[u8])> = spin::Once::new();

/// Initialize default output targets from config
pub(super) fn init_default_targets() {
    use crate::config;

    set_output_target(LogLevel::Error, config::LOG_OUTPUT_ERROR);
    set_output_target(LogLevel::Warn, config::LOG_OUTPUT_WARN);
    set_output_target(LogLevel::Info, config::LOG_OUTPUT_INFO);
    set_output_target(LogLevel::Debug, config::LOG_OUTPUT_DEBUG);
    set_output_target(LogLevel::Trace, config::LOG_OUTPUT_TRACE);
}

/// Get output target for a log level
pub fn get_output_target(level: LogLevel) -> OutputTarget {
    match OUTPUT_TARGETS.get(level as usize) {
        Some(slot) => OutputTarget::from_u8(slot.load(Ordering::Relaxed)),
        None => OutputTarget::None,
    }
}

/// Set output target for a log level
pub fn set_output_target(level: LogLevel, target: OutputTarget) {
    if let Some(slot) = OUTPUT_TARGETS.get(level as usize) {
        slot.store(target as u8, Ordering::Relaxed);
    }
}

/// Install the hosted log sink. Only the first call takes effect.
///
/// Has no effect on bare metal, where targets are real I/O ports.
pub fn set_host_sink(sink: fn(&[u8])) {
    HOST_SINK.call_once(|| sink);
}

/// Write bytes to the specified output target(s)
#[cfg(target_os = "none")]
pub fn write_bytes(target: OutputTarget, bytes: &[u8]) {
    match target {
        OutputTarget::None => {}
        OutputTarget::QemuDebug => write_qemu_debug(bytes),
        OutputTarget::Serial => write_serial(bytes),
        OutputTarget::Both => {
            write_qemu_debug(bytes);
            write_serial(bytes);
        }
    }
}

/// Write bytes to the hosted sink; every target maps onto the same sink.
#[cfg(not(target_os = "none"))]
pub fn write_bytes(target: OutputTarget, bytes: &[u8]) {
    if target == OutputTarget::None {
        return;
    }
    if let Some(sink) = HOST_SINK.get() {
        sink(bytes);
    }
}

#[cfg(target_os = "none")]
fn write_qemu_debug(bytes: &[u8]) {
    use x86_64::instructions::port::Port;

    let mut port: Port<u8> = Port::new(0xE9);
    for &byte in bytes {
        // SAFETY: port 0xE9 is QEMU's debugcon; writes are ignored on hardware without it
        unsafe { port.write(byte) };
    }
}

#[cfg(target_os = "none")]
fn write_serial(bytes: &[u8]) {
    use x86_64::instructions::port::Port;

    // Simple polling write to COM1 data register (no FIFO check)
    let mut port: Port<u8> = Port::new(0x3F8);
    for &byte in bytes {
        // SAFETY: COM1 data register; the kernel owns the UART while the monitor runs
        unsafe { port.write(byte) };
    }
}
