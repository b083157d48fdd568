//! Host-side harness for the kernel monitor
//!
//! [`demo::machine`] builds a populated [`kmon_kernel::sim::SimMachine`];
//! [`console::IoConsole`] connects it to stdin/stdout or a script file.

pub mod console;
pub mod demo;
