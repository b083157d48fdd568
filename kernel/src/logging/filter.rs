//! Per-module log level filtering
//!
//! Each module can have its own log level; everything else falls back to the
//! default level. Lookup is a hash-indexed static table with linear probing,
//! so filtering never allocates and works before any heap exists.

use super::LogLevel;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

/// Number of module filter slots
const FILTER_SLOTS: usize = 64;

/// Module filter entry
struct FilterEntry {
    /// Module name hash (0 = empty slot)
    hash: AtomicU32,
    /// Log level for this module (as u8)
    level: AtomicU8,
}

static MODULE_FILTERS: [FilterEntry; FILTER_SLOTS] = {
    #[allow(clippy::declare_interior_mutable_const)]
    const EMPTY: FilterEntry = FilterEntry {
        hash: AtomicU32::new(0),
        level: AtomicU8::new(LogLevel::Info as u8),
    };
    [EMPTY; FILTER_SLOTS]
};

/// Default log level for modules without specific configuration
static DEFAULT_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Module filter manager
pub struct ModuleFilter;

impl ModuleFilter {
    /// Get log level for a module
    pub fn get(module: &str) -> LogLevel {
        let hash = hash_module_name(module);
        let idx = (hash as usize) % FILTER_SLOTS;

        for i in 0..FILTER_SLOTS {
            let slot = &MODULE_FILTERS[(idx + i) % FILTER_SLOTS];
            let entry_hash = slot.hash.load(Ordering::Relaxed);
            if entry_hash == 0 {
                break;
            }
            if entry_hash == hash {
                return LogLevel::from_u8(slot.level.load(Ordering::Relaxed));
            }
        }

        Self::get_default()
    }

    /// Set log level for a module
    ///
    /// Returns `false` if the table is full and the override was dropped.
    pub fn set(module: &str, level: LogLevel) -> bool {
        let hash = hash_module_name(module);
        let idx = (hash as usize) % FILTER_SLOTS;

        for i in 0..FILTER_SLOTS {
            let slot = &MODULE_FILTERS[(idx + i) % FILTER_SLOTS];
            let entry_hash = slot.hash.load(Ordering::Relaxed);
            if entry_hash == 0 || entry_hash == hash {
                slot.level.store(level as u8, Ordering::Relaxed);
                slot.hash.store(hash, Ordering::Relaxed);
                return true;
            }
        }
        false
    }

    /// Set default log level for all modules without specific config
    pub fn set_default(level: LogLevel) {
        DEFAULT_LEVEL.store(level as u8, Ordering::Relaxed);
    }

    /// Get default log level
    pub fn get_default() -> LogLevel {
        LogLevel::from_u8(DEFAULT_LEVEL.load(Ordering::Relaxed))
    }
}

/// Check if a log message should be output
pub fn should_log(module: &str, level: LogLevel) -> bool {
    level <= ModuleFilter::get(module)
}

/// Set log level for a specific module
pub fn set_module_level(module: &str, level: LogLevel) -> bool {
    ModuleFilter::set(module, level)
}

/// Get log level for a specific module (or the default if not configured)
pub fn get_module_level(module: &str) -> LogLevel {
    ModuleFilter::get(module)
}

/// Initialize default log levels from config
pub(super) fn init_default_filters() {
    use crate::config;

    ModuleFilter::set_default(config::DEFAULT_LOG_LEVEL);
    for (module, level) in config::MODULE_LOG_LEVELS {
        ModuleFilter::set(module, *level);
    }
}

/// FNV-1a hash of a module name; never returns 0 (reserved for empty slots)
fn hash_module_name(s: &str) -> u32 {
    const FNV_PRIME: u32 = 16777619;
    const FNV_OFFSET: u32 = 2166136261;

    let mut hash = FNV_OFFSET;
    for byte in s.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }

    if hash == 0 {
        1
    } else {
        hash
    }
}
