//! kmon Kernel Monitor Library
//!
//! An interactive debug console that a kernel drops into synchronously (from a
//! trap handler, a panic path, or on request) to inspect live state:
//!
//! - `kerninfo`: linker boundary symbols and the image footprint
//! - `backtrace`: frame-pointer stack walk with symbol resolution
//! - `showmappings` / `setperm`: page-table inspection and permission edits
//! - `dump`: raw memory over virtual or physical ranges
//!
//! The monitor never touches hardware directly. Everything it needs (line
//! input, console output, register reads, the page-table walker, address
//! translation, symbol lookup) is reached through the traits in [`platform`].
//! [`platform::KernelPlatform`] wires those traits to real x86_64 hardware;
//! the `sim` feature provides a simulated machine for hosted use.
//!
//! ```ignore
//! static SYMBOLS: StaticSymbolTable = StaticSymbolTable::new(&GENERATED_SYMBOLS);
//!
//! extern "x86-interrupt" fn breakpoint(frame: InterruptStackFrame) {
//!     let translator = PhysOffset::new(PHYS_OFFSET).with_kernel_image(KERNEL_VIRTUAL_BASE, 0);
//!     let mut platform =
//!         unsafe { KernelPlatform::new(SerialConsole, translator, kernel_pml4(), &SYMBOLS, layout()) };
//!     kmon_kernel::monitor(&mut platform, Some(&frame));
//! }
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

// Macros must be declared before they're used
#[macro_use]
pub mod logging;

pub mod cpu;
pub mod memory;
pub mod monitor;
pub mod platform;
pub mod stack;
pub mod symbols;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

// Config must come after logging since it references logging types
pub mod config;

pub use monitor::{monitor, CommandStatus, Monitor, MonitorExit, QuitPolicy};
pub use platform::Platform;
