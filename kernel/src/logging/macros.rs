//! Logging macros
//!
//! - `log_error!` - Failures the monitor cannot recover from
//! - `log_warn!` - Conditions worth a look
//! - `log_info!` - State changes
//! - `log_debug!` - Dispatch decisions and intermediate values
//! - `log_trace!` - Per-iteration detail
//!
//! All macros capture module path, file and line; DEBUG and TRACE also
//! capture the enclosing function name. Messages are formatted into a
//! 256-byte buffer on the caller's stack, and only after the level filter
//! has accepted them.

/// Shared expansion for the level macros
#[doc(hidden)]
#[macro_export]
macro_rules! __log_at {
    ($level:expr, $func:expr, $($arg:tt)*) => {{
        let level = $level;
        if $crate::logging::enabled(level, module_path!()) {
            use core::fmt::Write as _;
            let mut format_buf = [0u8; 256];
            let mut writer = $crate::logging::StackWriter::new(&mut format_buf);
            let _ = write!(writer, $($arg)*);
            $crate::logging::log_impl(
                level,
                module_path!(),
                file!(),
                line!(),
                $func,
                writer.as_str(),
            );
        }
    }};
}

/// Name of the function enclosing the macro call site
#[doc(hidden)]
#[macro_export]
macro_rules! __function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            core::any::type_name::<T>()
        }
        let name = type_name_of(f);
        name.rsplit("::").nth(1).unwrap_or("unknown")
    }};
}

/// Log an ERROR level message
///
/// ```text
/// [ERROR module] message
/// ```
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::__log_at!($crate::logging::LogLevel::Error, None, $($arg)*)
    };
}

/// Log a WARN level message
///
/// ```text
/// [WARN  module] message
/// ```
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::__log_at!($crate::logging::LogLevel::Warn, None, $($arg)*)
    };
}

/// Log an INFO level message
///
/// ```text
/// [INFO  module] message
/// ```
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::__log_at!($crate::logging::LogLevel::Info, None, $($arg)*)
    };
}

/// Log a DEBUG level message (includes function name)
///
/// ```text
/// [DEBUG module::function@file:line] message
/// ```
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::__log_at!(
            $crate::logging::LogLevel::Debug,
            Some($crate::__function_name!()),
            $($arg)*
        )
    };
}

/// Log a TRACE level message (includes function name)
///
/// ```text
/// [TRACE module::function@file:line] message
/// ```
#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {
        $crate::__log_at!(
            $crate::logging::LogLevel::Trace,
            Some($crate::__function_name!()),
            $($arg)*
        )
    };
}
