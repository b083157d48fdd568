//! # Kernel Monitor - Interactive Debugging Console
//!
//! A minimal command shell the kernel drops into synchronously, e.g. from a
//! breakpoint trap or a panic path. The monitor prints a banner, then reads
//! one line at a time, splits it into arguments and dispatches the first
//! argument against a static command registry. Control returns to the caller
//! once the quit policy says the session is over.
//!
//! ## Commands
//!
//! - `help`: list commands
//! - `kerninfo`: linker symbols and image footprint
//! - `backtrace`: frame-pointer stack walk
//! - `showmappings START END`: page-table entries over a range
//! - `setperm VA PERM`: rewrite the permission bits of one entry
//! - `dump va|pa START END`: raw bytes over a virtual or physical range
//! - `loglevel [LEVEL [MODULE]]`: inspect or change log filtering
//! - `exit`: leave the monitor
//!
//! ## Module Organization
//!
//! - `commands/`: the registry and every command, organized by category
//! - `parsing`: argument splitting and hex parsing

pub mod commands;
pub mod parsing;

pub use commands::{dispatch, Command, CommandContext, CommandHandler, COMMANDS};

use crate::config;
use crate::logging;
use crate::platform::{Console, Platform};
use alloc::format;
use alloc::string::String;
use core::fmt::Write;
use x86_64::structures::idt::InterruptStackFrame;

/// Outcome of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    /// Wrong number or shape of arguments; carries the command's usage line
    ArgumentError(String),
    /// The command ran but could not finish; carries a negative code
    Failed(i32),
    /// Leave the monitor
    Quit,
}

impl CommandStatus {
    /// Single signed status as the classic monitor reported it: 0 for
    /// success, negative for anything that should end the session.
    pub fn legacy_code(&self) -> i32 {
        match self {
            CommandStatus::Success => 0,
            CommandStatus::ArgumentError(_) => -1,
            CommandStatus::Failed(code) => *code,
            CommandStatus::Quit => -1,
        }
    }
}

/// Which command statuses end the monitor session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuitPolicy {
    /// Only an explicit [`CommandStatus::Quit`]
    #[default]
    Explicit,
    /// Any status with a negative legacy code, argument errors included
    AnyFailure,
}

impl QuitPolicy {
    pub fn ends_session(&self, status: &CommandStatus) -> bool {
        match self {
            QuitPolicy::Explicit => *status == CommandStatus::Quit,
            QuitPolicy::AnyFailure => status.legacy_code() < 0,
        }
    }
}

/// Why [`Monitor::run`] returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorExit {
    /// The console has no more input
    EndOfInput,
    /// The quit policy ended the session on this status
    Quit(CommandStatus),
    /// [`config::ENABLE_KERNEL_MONITOR`] is off
    Disabled,
}

/// Kernel monitor state
///
/// One session over a platform. The monitor itself is stateless between
/// commands; everything it inspects lives behind the platform.
pub struct Monitor<'p> {
    platform: &'p mut dyn Platform,
    policy: QuitPolicy,
    registry: &'static [Command],
}

impl<'p> Monitor<'p> {
    pub fn new(platform: &'p mut dyn Platform) -> Self {
        Self {
            platform,
            policy: config::DEFAULT_QUIT_POLICY,
            registry: COMMANDS,
        }
    }

    pub fn with_policy(mut self, policy: QuitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Dispatch against `registry` instead of the built-in [`COMMANDS`]
    pub fn with_registry(mut self, registry: &'static [Command]) -> Self {
        self.registry = registry;
        self
    }

    pub fn policy(&self) -> QuitPolicy {
        self.policy
    }

    fn writeln(&mut self, s: &str) {
        let _ = self.platform.write_str(s);
        let _ = self.platform.write_str("\n");
    }

    /// Run the interactive loop until the quit policy or the console ends it.
    ///
    /// `trap` is handed to every command untouched.
    pub fn run(&mut self, trap: Option<&InterruptStackFrame>) -> MonitorExit {
        if !config::ENABLE_KERNEL_MONITOR {
            return MonitorExit::Disabled;
        }
        logging::init();
        log_info!("entering monitor ({:?} quit policy)", self.policy);

        self.writeln("Welcome to the kernel monitor!");
        self.writeln("Type 'help' for a list of commands.");

        loop {
            let Some(line) = self.platform.read_line(config::PROMPT) else {
                log_info!("console closed, leaving monitor");
                return MonitorExit::EndOfInput;
            };

            let status = self.run_command(&line, trap);
            if self.policy.ends_session(&status) {
                log_info!("leaving monitor on {:?}", status);
                return MonitorExit::Quit(status);
            }

            match status {
                CommandStatus::ArgumentError(usage) => self.writeln(&format!("usage: {}", usage)),
                CommandStatus::Failed(code) => self.writeln(&format!("command failed ({})", code)),
                CommandStatus::Success | CommandStatus::Quit => {}
            }
        }
    }

    /// Parse and execute a single line (`runcmd`).
    ///
    /// Blank lines, unknown commands and lines with too many arguments all
    /// report [`CommandStatus::Success`]; the last two print a message first.
    pub fn run_command(&mut self, line: &str, trap: Option<&InterruptStackFrame>) -> CommandStatus {
        let argv = match parsing::parse_args(line) {
            Ok(argv) => argv,
            Err(err) => {
                log_warn!("rejected line: {}", err);
                self.writeln(&format!("{}", err));
                return CommandStatus::Success;
            }
        };

        let mut ctx = CommandContext {
            platform: &mut *self.platform,
            trap,
            registry: self.registry,
        };
        dispatch(self.registry, &argv, &mut ctx)
    }
}

/// Enter the monitor on `platform` with the default quit policy
///
/// This is the entry point trap handlers call. It returns once the session
/// ends so the caller can resume (or halt).
pub fn monitor(platform: &mut dyn Platform, trap: Option<&InterruptStackFrame>) -> MonitorExit {
    Monitor::new(platform).run(trap)
}
