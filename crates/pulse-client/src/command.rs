//! Interactive commands read from stdin.

/// A parsed stdin command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Retry a failed feed load.
    Retry,
    /// Tear down and rebuild the store, bridge and feed.
    Reload,
    /// Print the diagnostic session status and bridge mode.
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "commands: retry, reload, status, help, quit";

impl Command {
    /// Parses one input line. Blank lines and unknown words yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "retry" | "r" => Some(Command::Retry),
            "reload" => Some(Command::Reload),
            "status" | "s" => Some(Command::Status),
            "help" | "?" => Some(Command::Help),
            "quit" | "exit" | "q" => Some(Command::Quit),
            _ => None,
        }
    }
}
