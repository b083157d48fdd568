//! Line console over any reader/writer pair
//!
//! Queued lines (from `--command`) are served before the reader. When the
//! input is not a terminal the line is echoed after the prompt, so a scripted
//! transcript reads like an interactive one.

use kmon_kernel::platform::Console;
use std::collections::VecDeque;
use std::fmt;
use std::io::{BufRead, Write};

pub struct IoConsole<R, W> {
    input: R,
    output: W,
    queued: VecDeque<String>,
    echo: bool,
}

impl<R: BufRead, W: Write> IoConsole<R, W> {
    pub fn new(input: R, output: W, echo: bool) -> Self {
        Self {
            input,
            output,
            queued: VecDeque::new(),
            echo,
        }
    }

    /// Serve `line` before anything read from the input
    pub fn queue(&mut self, line: impl Into<String>) {
        self.queued.push_back(line.into());
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn next_line(&mut self) -> Option<String> {
        if let Some(line) = self.queued.pop_front() {
            return Some(line);
        }

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => {
                let trimmed = line.trim_end_matches(['\r', '\n']).len();
                line.truncate(trimmed);
                Some(line)
            }
            Err(err) => {
                eprintln!("kmon-sim: input error: {err}");
                None
            }
        }
    }
}

impl<R: BufRead, W: Write> fmt::Write for IoConsole<R, W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.output.write_all(s.as_bytes()).map_err(|_| fmt::Error)
    }
}

impl<R: BufRead, W: Write> Console for IoConsole<R, W> {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        let _ = self.output.write_all(prompt.as_bytes());
        let _ = self.output.flush();

        let line = self.next_line()?;
        if self.echo {
            let _ = writeln!(self.output, "{line}");
        }
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn queued_lines_come_first_and_crlf_is_stripped() {
        let mut console = IoConsole::new(Cursor::new("kerninfo\r\nexit\n"), Vec::new(), true);
        console.queue("help");

        assert_eq!(console.read_line("K> ").as_deref(), Some("help"));
        assert_eq!(console.read_line("K> ").as_deref(), Some("kerninfo"));
        assert_eq!(console.read_line("K> ").as_deref(), Some("exit"));
        assert_eq!(console.read_line("K> "), None);

        let out = String::from_utf8(console.into_output()).unwrap();
        assert_eq!(out, "K> help\nK> kerninfo\nK> exit\nK> ");
    }

    #[test]
    fn no_echo_for_interactive_input() {
        let mut console = IoConsole::new(Cursor::new("help\n"), Vec::new(), false);
        assert_eq!(console.read_line("K> ").as_deref(), Some("help"));
        assert_eq!(console.into_output(), b"K> ");
    }
}
