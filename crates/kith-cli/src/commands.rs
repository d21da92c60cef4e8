//! Input line parsing.
//!
//! Lines starting with `/` are commands; anything else is a message for the
//! active conversation.

use kith_proto::{GroupId, UserId};

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open the private conversation with a user.
    Dm(UserId),
    /// Open a group conversation.
    Group(GroupId),
    /// List online users.
    Online,
    /// Show the activity feed.
    Feed,
    /// Mark all notifications read.
    Read,
    /// Retry a failed history load.
    Retry,
    /// Leave the client.
    Quit,
    /// Send a message to the active conversation.
    Say(String),
    /// Input that could not be understood, with a hint.
    Invalid(String),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let Some(cmd) = line.strip_prefix('/') else {
        return Some(Command::Say(line.to_string()));
    };

    let parts: Vec<&str> = cmd.split_whitespace().collect();
    let command = parts.first().copied().unwrap_or("");

    let parsed = match command {
        "dm" => match parts.get(1).map(|s| s.parse::<UserId>()) {
            Some(Ok(user)) => Command::Dm(user),
            _ => Command::Invalid("Usage: /dm <user_id>".into()),
        },
        "group" => match parts.get(1).map(|s| s.parse::<GroupId>()) {
            Some(Ok(group)) => Command::Group(group),
            _ => Command::Invalid("Usage: /group <group_id>".into()),
        },
        "online" => Command::Online,
        "feed" => Command::Feed,
        "read" => Command::Read,
        "retry" => Command::Retry,
        "quit" | "q" => Command::Quit,
        other => Command::Invalid(format!("Unknown command /{other}")),
    };
    Some(parsed)
}
