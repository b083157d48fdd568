//! Symbol lookup for backtraces
//!
//! The monitor does not parse debug info. The embedding kernel hands it a
//! table of functions (typically generated at build time from the ELF symbol
//! table) and [`StaticSymbolTable`] answers address queries against it.

use crate::platform::SymbolResolver;
use core::fmt;

/// What a code address resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolInfo<'a> {
    /// Source file of the function
    pub file: &'a str,
    /// Source line (function granularity)
    pub line: u32,
    /// Function name as stored in the table; may carry a `:`-separated suffix
    pub name: &'a str,
    /// Number of bytes of `name` that are the actual function name
    pub name_len: usize,
    /// First address of the function
    pub fn_addr: u64,
}

impl<'a> SymbolInfo<'a> {
    /// `name` truncated to `name_len`
    pub fn display_name(&self) -> &'a str {
        self.name.get(..self.name_len).unwrap_or(self.name)
    }
}

/// Symbol lookup failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolError {
    /// No function covers this address
    NotFound(u64),
}

impl SymbolError {
    /// Signed status reported when this error ends a command
    pub const fn code(&self) -> i32 {
        match self {
            SymbolError::NotFound(_) => -1,
        }
    }
}

impl fmt::Display for SymbolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolError::NotFound(addr) => write!(f, "no symbol covers {:#x}", addr),
        }
    }
}

/// One function in a symbol table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolEntry {
    /// First address of the function
    pub start: u64,
    /// One past the last address of the function
    pub end: u64,
    /// Name, optionally followed by `:` and type information
    pub name: &'static str,
    pub file: &'static str,
    pub line: u32,
}

impl SymbolEntry {
    pub const fn new(
        start: u64,
        end: u64,
        name: &'static str,
        file: &'static str,
        line: u32,
    ) -> Self {
        Self {
            start,
            end,
            name,
            file,
            line,
        }
    }
}

/// Lookup over a slice of entries sorted by `start`
#[derive(Debug, Clone, Copy)]
pub struct StaticSymbolTable<'a> {
    entries: &'a [SymbolEntry],
}

impl<'a> StaticSymbolTable<'a> {
    /// `entries` must be sorted by `start` and non-overlapping.
    pub const fn new(entries: &'a [SymbolEntry]) -> Self {
        Self { entries }
    }

    pub fn lookup(&self, addr: u64) -> Result<SymbolInfo<'a>, SymbolError> {
        // Index of the first entry starting after `addr`
        let idx = self.entries.partition_point(|e| e.start <= addr);
        let entry = idx
            .checked_sub(1)
            .map(|i| &self.entries[i])
            .filter(|e| addr < e.end)
            .ok_or(SymbolError::NotFound(addr))?;

        Ok(SymbolInfo {
            file: entry.file,
            line: entry.line,
            name: entry.name,
            name_len: entry.name.find(':').unwrap_or(entry.name.len()),
            fn_addr: entry.start,
        })
    }
}

impl SymbolResolver for StaticSymbolTable<'_> {
    fn resolve(&self, addr: u64) -> Result<SymbolInfo<'_>, SymbolError> {
        self.lookup(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTRIES: &[SymbolEntry] = &[
        SymbolEntry::new(0x1000, 0x1080, "kernel_entry", "kernel/src/lib.rs", 12),
        SymbolEntry::new(0x1080, 0x1200, "mon_backtrace:F(0,1)", "kernel/src/monitor.rs", 88),
        SymbolEntry::new(0x2000, 0x2010, "idle", "kernel/src/sched.rs", 5),
    ];

    #[test]
    fn resolves_inside_function() {
        let table = StaticSymbolTable::new(ENTRIES);
        let info = table.lookup(0x10a4).expect("covered");
        assert_eq!(info.fn_addr, 0x1080);
        assert_eq!(info.display_name(), "mon_backtrace");
        assert_eq!(info.file, "kernel/src/monitor.rs");
        assert_eq!(info.line, 88);
    }

    #[test]
    fn function_start_and_last_byte_resolve() {
        let table = StaticSymbolTable::new(ENTRIES);
        assert_eq!(table.lookup(0x1000).map(|i| i.fn_addr), Ok(0x1000));
        assert_eq!(table.lookup(0x107f).map(|i| i.fn_addr), Ok(0x1000));
    }

    #[test]
    fn gaps_and_edges_fail() {
        let table = StaticSymbolTable::new(ENTRIES);
        assert_eq!(table.lookup(0xfff), Err(SymbolError::NotFound(0xfff)));
        assert_eq!(table.lookup(0x1200), Err(SymbolError::NotFound(0x1200)));
        assert_eq!(table.lookup(0x2010), Err(SymbolError::NotFound(0x2010)));
        assert_eq!(SymbolError::NotFound(0).code(), -1);
    }
}
