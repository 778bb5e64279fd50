/// Token a client sends to replay the chat history.
pub const HISTORY_TOKEN: &str = "/history";

/// Token a client sends to ask how many users are connected.
pub const USER_COUNT_TOKEN: &str = "/users";

/// What an incoming line asks the server to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Replay every stored chat line back to the requester.
    History,
    /// Report the number of connected sessions to the requester.
    UserCount,
    /// Anything else, broadcast to everyone.
    Chat(String),
}

impl Command {
    /// Classify a line. Surrounding whitespace is ignored; the control tokens
    /// must otherwise match exactly (no prefixes, case-sensitive).
    pub fn classify(line: &str) -> Self {
        match line.trim() {
            HISTORY_TOKEN => Command::History,
            USER_COUNT_TOKEN => Command::UserCount,
            text => Command::Chat(text.to_string()),
        }
    }
}
