//! Monitor command implementations
//!
//! Every command is a unit struct implementing [`CommandHandler`], listed in
//! the static [`COMMANDS`] registry and organized by category:
//! - `system`: `help`, `kerninfo`, `backtrace`
//! - `tables`: `showmappings`, `setperm`
//! - `memory`: `dump`
//! - `control`: `loglevel`, `exit`

pub mod control;
pub mod memory;
pub mod system;
pub mod tables;

use super::parsing::parse_hex;
use super::CommandStatus;
use crate::platform::Platform;
use alloc::format;
use alloc::string::String;
use core::fmt::Write;
use x86_64::structures::idt::InterruptStackFrame;

/// What a command gets to work with
pub struct CommandContext<'a> {
    pub platform: &'a mut dyn Platform,
    /// Trap that entered the monitor, passed through unexamined
    pub trap: Option<&'a InterruptStackFrame>,
    /// Registry the command was dispatched from
    pub registry: &'static [Command],
}

impl CommandContext<'_> {
    pub fn write(&mut self, s: &str) {
        let _ = self.platform.write_str(s);
    }

    pub fn writeln(&mut self, s: &str) {
        self.write(s);
        self.write("\n");
    }

    /// Parse a hex operand, reporting a malformed one on the console
    pub fn hex_arg(&mut self, token: &str, usage: &str) -> Result<u64, CommandStatus> {
        parse_hex(token).map_err(|err| {
            self.writeln(&format!("{}: '{}'", err, token));
            CommandStatus::ArgumentError(String::from(usage))
        })
    }
}

/// A single "execute" capability
pub trait CommandHandler: Sync {
    /// `args[0]` is the command name itself
    fn execute(&self, args: &[&str], ctx: &mut CommandContext<'_>) -> CommandStatus;
}

/// Registry entry
pub struct Command {
    pub name: &'static str,
    pub description: &'static str,
    pub handler: &'static dyn CommandHandler,
}

/// Built-in commands, in `help` order
pub static COMMANDS: &[Command] = &[
    Command {
        name: "help",
        description: "Display this list of commands",
        handler: &system::Help,
    },
    Command {
        name: "kerninfo",
        description: "Display information about the kernel",
        handler: &system::KernInfo,
    },
    Command {
        name: "backtrace",
        description: "Display a stack backtrace",
        handler: &system::Backtrace,
    },
    Command {
        name: "showmappings",
        description: "Display the page mappings of a virtual address range",
        handler: &tables::ShowMappings,
    },
    Command {
        name: "setperm",
        description: "Set the permission bits of a page",
        handler: &tables::SetPerm,
    },
    Command {
        name: "dump",
        description: "Dump the contents of a virtual or physical memory range",
        handler: &memory::Dump,
    },
    Command {
        name: "loglevel",
        description: "Show or change log levels",
        handler: &control::LogLevelCmd,
    },
    Command {
        name: "exit",
        description: "Leave the kernel monitor",
        handler: &control::Exit,
    },
];

/// Look up `argv[0]` in `registry` and run it.
///
/// Names match exactly (case-sensitive); the first match wins.
pub fn dispatch(registry: &[Command], argv: &[&str], ctx: &mut CommandContext<'_>) -> CommandStatus {
    let Some(name) = argv.first() else {
        return CommandStatus::Success;
    };

    match registry.iter().find(|cmd| cmd.name == *name) {
        Some(cmd) => {
            log_debug!("dispatch '{}' with {} args", cmd.name, argv.len());
            cmd.handler.execute(argv, ctx)
        }
        None => {
            log_debug!("no command named '{}'", name);
            ctx.writeln(&format!("Unknown command '{}'", name));
            CommandStatus::Success
        }
    }
}

/// Addresses `start, start + stride, ...` up to and including `end`.
///
/// Empty when `start > end`; stops instead of wrapping at the top of the
/// address space.
pub(crate) fn address_range(start: u64, end: u64, stride: u64) -> impl Iterator<Item = u64> {
    core::iter::successors((start <= end).then_some(start), move |addr| {
        addr.checked_add(stride).filter(|next| *next <= end)
    })
}

#[cfg(test)]
pub(crate) fn run_line(sim: &mut crate::sim::SimMachine, line: &str) -> (CommandStatus, String) {
    let status = super::Monitor::new(&mut *sim).run_command(line, None);
    (status, sim.console_mut().take_output())
}
