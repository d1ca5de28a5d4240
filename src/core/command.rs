/// A user command, resolved once at the dispatch boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolkitCommand {
    /// `info`: print the toolkit description
    Info,
    /// `shell`: open the interactive adb shell. Keeps the input as typed.
    Shell(String),
    /// `exit`: leave the interactive shell. Keeps the input as typed.
    Exit(String),
    /// Blank input
    Empty,
    /// Anything else, passed to adb untouched
    Passthrough(String),
}

impl ToolkitCommand {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() {
            ToolkitCommand::Empty
        } else if input.eq_ignore_ascii_case("info") {
            ToolkitCommand::Info
        } else if input.eq_ignore_ascii_case("shell") {
            ToolkitCommand::Shell(input.to_string())
        } else if input.eq_ignore_ascii_case("exit") {
            ToolkitCommand::Exit(input.to_string())
        } else {
            ToolkitCommand::Passthrough(input.to_string())
        }
    }

    /// Whether the command is one of the reserved keywords
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            ToolkitCommand::Info | ToolkitCommand::Shell(_) | ToolkitCommand::Exit(_)
        )
    }

    /// The trimmed text as the user typed it, for adb or the shell
    pub fn text(&self) -> &str {
        match self {
            ToolkitCommand::Info => "info",
            ToolkitCommand::Empty => "",
            ToolkitCommand::Shell(text)
            | ToolkitCommand::Exit(text)
            | ToolkitCommand::Passthrough(text) => text,
        }
    }
}
