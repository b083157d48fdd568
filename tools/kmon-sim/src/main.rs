use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use kmon_kernel::logging::{self, LogLevel, ModuleFilter};
use kmon_kernel::{CommandStatus, Monitor, MonitorExit, QuitPolicy};
use kmon_sim::{console::IoConsole, demo};

#[derive(Parser, Debug)]
#[command(
    name = "kmon-sim",
    version,
    about = "Run the kernel monitor against a simulated machine"
)]
pub struct Cli {
    /// Read monitor input from this file instead of stdin
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Quit on any failing command, like the classic monitor
    #[arg(long)]
    pub legacy_quit: bool,

    /// Diagnostic log level (written to stderr)
    #[arg(long, value_enum, default_value_t = Level::Warn)]
    pub log_level: Level,

    /// Command to run before reading input (repeatable)
    #[arg(long = "command", short = 'c')]
    pub commands: Vec<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Error => LogLevel::Error,
            Level::Warn => LogLevel::Warn,
            Level::Info => LogLevel::Info,
            Level::Debug => LogLevel::Debug,
            Level::Trace => LogLevel::Trace,
        }
    }
}

fn stderr_sink(bytes: &[u8]) {
    let _ = io::stderr().write_all(bytes);
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init();
    logging::set_host_sink(stderr_sink);
    ModuleFilter::set_default(cli.log_level.into());

    let (input, echo): (Box<dyn BufRead>, bool) = match &cli.script {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open script {}", path.display()))?;
            (Box::new(BufReader::new(file)), true)
        }
        None => (Box::new(io::stdin().lock()), !io::stdin().is_terminal()),
    };

    let mut console = IoConsole::new(input, io::stdout().lock(), echo);
    for line in &cli.commands {
        console.queue(line.as_str());
    }

    let policy = if cli.legacy_quit {
        QuitPolicy::AnyFailure
    } else {
        QuitPolicy::Explicit
    };

    let mut machine = demo::machine(console);
    let exit = Monitor::new(&mut machine).with_policy(policy).run(None);

    let mut stdout = machine.into_console().into_output();
    writeln!(stdout).context("failed to write to stdout")?;
    stdout.flush().context("failed to flush stdout")?;

    match exit {
        MonitorExit::Quit(status @ (CommandStatus::ArgumentError(_) | CommandStatus::Failed(_))) => {
            bail!("monitor quit with status {}", status.legacy_code())
        }
        MonitorExit::Quit(_) | MonitorExit::EndOfInput | MonitorExit::Disabled => Ok(()),
    }
}
