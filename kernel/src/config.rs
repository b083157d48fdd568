//! Monitor configuration constants
//!
//! Centralized configuration for monitor behavior and logging defaults. Other
//! modules should import these values from `kmon_kernel::config` to keep
//! configuration in a single place.

use crate::monitor::QuitPolicy;

/// When `false`, [`crate::monitor::monitor`] returns immediately without
/// printing the banner or reading input.
pub const ENABLE_KERNEL_MONITOR: bool = true;

/// Prompt printed before every line read.
pub const PROMPT: &str = "K> ";

/// Maximum argument slots per line, one of which is reserved as the
/// terminator. A line with `MAX_ARGS` or more tokens is rejected.
pub const MAX_ARGS: usize = 16;

/// Upper bound on frames printed by `backtrace` before giving up on a chain
/// that never reaches 0.
pub const MAX_BACKTRACE_DEPTH: usize = 64;

/// How the monitor loop reacts to command statuses.
///
/// `Explicit` only leaves on `exit`; `AnyFailure` mirrors the classic monitor
/// where every negative status (including argument errors) quits.
pub const DEFAULT_QUIT_POLICY: QuitPolicy = QuitPolicy::Explicit;

// ============================================================================
// Logging Configuration
// ============================================================================

use crate::logging::{LogLevel, OutputTarget};

/// Default log level for modules without specific configuration
pub const DEFAULT_LOG_LEVEL: LogLevel = LogLevel::Info;

/// Per-module log level overrides
///
/// Format: ("module::path", LogLevel::Level)
pub const MODULE_LOG_LEVELS: &[(&str, LogLevel)] = &[
    // Example overrides:
    // ("kmon_kernel::monitor", LogLevel::Debug),
    // ("kmon_kernel::monitor::commands::tables", LogLevel::Trace),
];

/// Output target for ERROR level logs
pub const LOG_OUTPUT_ERROR: OutputTarget = OutputTarget::Both;

/// Output target for WARN level logs
pub const LOG_OUTPUT_WARN: OutputTarget = OutputTarget::Both;

/// Output target for INFO level logs
pub const LOG_OUTPUT_INFO: OutputTarget = OutputTarget::QemuDebug;

/// Output target for DEBUG level logs
pub const LOG_OUTPUT_DEBUG: OutputTarget = OutputTarget::QemuDebug;

/// Output target for TRACE level logs
pub const LOG_OUTPUT_TRACE: OutputTarget = OutputTarget::QemuDebug;
