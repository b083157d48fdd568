//! Monitor control commands
//!
//! - `loglevel`: Inspect or change log filtering at runtime
//! - `exit`: Leave the monitor

use super::{CommandContext, CommandHandler};
use crate::logging::{self, LogLevel, ModuleFilter};
use crate::monitor::CommandStatus;
use alloc::format;
use alloc::string::String;

const LOGLEVEL_USAGE: &str = "loglevel [error|warn|info|debug|trace] [MODULE]";

/// Show or change log levels
///
/// # Examples
/// ```text
/// loglevel                                   # show default level
/// loglevel debug                             # change default level
/// loglevel trace kmon_kernel::monitor::commands::tables
/// ```
pub struct LogLevelCmd;

impl CommandHandler for LogLevelCmd {
    fn execute(&self, args: &[&str], ctx: &mut CommandContext<'_>) -> CommandStatus {
        let (level, module) = match args {
            [_] => {
                ctx.writeln(&format!("Default log level: {}", ModuleFilter::get_default()));
                return CommandStatus::Success;
            }
            [_, level] => (level, None),
            [_, level, module] => (level, Some(*module)),
            _ => return CommandStatus::ArgumentError(String::from(LOGLEVEL_USAGE)),
        };

        let Some(level) = LogLevel::parse(level) else {
            ctx.writeln(&format!("Unknown log level '{}'", level));
            return CommandStatus::ArgumentError(String::from(LOGLEVEL_USAGE));
        };

        match module {
            None => {
                ModuleFilter::set_default(level);
                ctx.writeln(&format!("Default log level set to {}", level));
            }
            Some(module) => {
                if !logging::set_module_level(module, level) {
                    log_error!("module filter table full, dropped override for {}", module);
                    ctx.writeln("Module filter table is full");
                    return CommandStatus::Failed(-1);
                }
                ctx.writeln(&format!("Log level for {} set to {}", module, level));
            }
        }
        CommandStatus::Success
    }
}

pub struct Exit;

impl CommandHandler for Exit {
    fn execute(&self, _args: &[&str], ctx: &mut CommandContext<'_>) -> CommandStatus {
        ctx.writeln("Leaving kernel monitor");
        CommandStatus::Quit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::commands::run_line;
    use crate::sim::SimMachine;

    #[test]
    fn exit_requests_quit() {
        let mut sim = SimMachine::new();
        let (status, out) = run_line(&mut sim, "exit");
        assert_eq!(status, CommandStatus::Quit);
        assert_eq!(out, "Leaving kernel monitor\n");
    }

    #[test]
    fn module_override_is_applied() {
        let module = "kmon_kernel::loglevel_test_module";
        let mut sim = SimMachine::new();
        let (status, out) = run_line(&mut sim, &format!("loglevel TRACE {}", module));
        assert_eq!(status, CommandStatus::Success);
        assert_eq!(out, format!("Log level for {} set to TRACE\n", module));
        assert_eq!(logging::get_module_level(module), LogLevel::Trace);
    }

    #[test]
    fn default_level_round_trip() {
        // Make sure a later first-time init cannot reset the default mid-test
        logging::init();
        let mut sim = SimMachine::new();
        let original = ModuleFilter::get_default();

        let (status, out) = run_line(&mut sim, "loglevel warn");
        assert_eq!(status, CommandStatus::Success);
        assert_eq!(out, "Default log level set to WARN\n");
        let (_, out) = run_line(&mut sim, "loglevel");
        assert_eq!(out, "Default log level: WARN\n");

        ModuleFilter::set_default(original);
    }

    #[test]
    fn bad_level_and_arity_are_argument_errors() {
        let mut sim = SimMachine::new();
        let (status, out) = run_line(&mut sim, "loglevel loud");
        assert_eq!(status, CommandStatus::ArgumentError(String::from(LOGLEVEL_USAGE)));
        assert_eq!(out, "Unknown log level 'loud'\n");

        let (status, _) = run_line(&mut sim, "loglevel info a b");
        assert!(matches!(status, CommandStatus::ArgumentError(_)));
    }
}
