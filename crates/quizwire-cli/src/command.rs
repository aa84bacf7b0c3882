//! Input line parsing.
//!
//! Lines starting with `/` are commands. Anything else is chat text for the
//! current room.
//!
//! ```text
//! /connect            start a broker session
//! /disconnect         end it
//! /join <room_id>     follow a room
//! /leave              stop following it
//! /start              start the match (host only)
//! /answer <option>    answer with the option text
//! /pick <n>           answer with the n-th option, 1-based
//! /chat open|close    mark the chat view open or closed
//! /quit               leave and exit
//! ```

use thiserror::Error;

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a broker session with the configured token.
    Connect,
    /// End the broker session.
    Disconnect,
    /// Follow a room.
    Join(String),
    /// Stop following the room.
    Leave,
    /// Start the match.
    Start,
    /// Answer with the given option text.
    Answer(String),
    /// Answer with the option at this 1-based position.
    Pick(usize),
    /// Chat view opened or closed.
    ChatView(bool),
    /// Chat text.
    Say(String),
    /// Exit.
    Quit,
}

/// Input that is not a valid command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Known command with missing or malformed arguments.
    #[error("usage: {0}")]
    Usage(&'static str),

    /// Unknown command name.
    #[error("unknown command: /{0}")]
    Unknown(String),
}

/// Parse one input line.
///
/// Returns `Ok(None)` for blank lines.
///
/// # Errors
///
/// - `CommandError::Usage` if a command is missing its argument
/// - `CommandError::Unknown` for unrecognised command names
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(cmd) = line.strip_prefix('/') else {
        return Ok(Some(Command::Say(line.to_string())));
    };

    let (name, rest) = cmd.split_once(char::is_whitespace).unwrap_or((cmd, ""));
    let rest = rest.trim();

    let command = match name {
        "connect" => Command::Connect,
        "disconnect" => Command::Disconnect,
        "join" => match rest.split_whitespace().next() {
            Some(room_id) => Command::Join(room_id.to_string()),
            None => return Err(CommandError::Usage("/join <room_id>")),
        },
        "leave" => Command::Leave,
        "start" => Command::Start,
        "answer" | "a" => {
            if rest.is_empty() {
                return Err(CommandError::Usage("/answer <option>"));
            }
            Command::Answer(rest.to_string())
        },
        "pick" | "p" => match rest.parse::<usize>() {
            Ok(n) if n > 0 => Command::Pick(n),
            _ => return Err(CommandError::Usage("/pick <n>")),
        },
        "chat" => match rest {
            "open" => Command::ChatView(true),
            "close" => Command::ChatView(false),
            _ => return Err(CommandError::Usage("/chat open|close")),
        },
        "quit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_chat() {
        assert_eq!(parse("  good luck  ").unwrap(), Some(Command::Say("good luck".into())));
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn answer_keeps_multi_word_options() {
        assert_eq!(parse("/answer New York").unwrap(), Some(Command::Answer("New York".into())));
        assert_eq!(parse("/a Paris").unwrap(), Some(Command::Answer("Paris".into())));
        assert_eq!(parse("/answer"), Err(CommandError::Usage("/answer <option>")));
    }

    #[test]
    fn pick_is_one_based() {
        assert_eq!(parse("/pick 2").unwrap(), Some(Command::Pick(2)));
        assert!(parse("/pick 0").is_err());
        assert!(parse("/pick two").is_err());
    }

    #[test]
    fn join_takes_first_word() {
        assert_eq!(parse("/join r42 extra").unwrap(), Some(Command::Join("r42".into())));
        assert_eq!(parse("/join"), Err(CommandError::Usage("/join <room_id>")));
    }

    #[test]
    fn chat_view_and_quit() {
        assert_eq!(parse("/chat open").unwrap(), Some(Command::ChatView(true)));
        assert_eq!(parse("/chat close").unwrap(), Some(Command::ChatView(false)));
        assert_eq!(parse("/q").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn unknown_commands_are_reported() {
        assert_eq!(parse("/dance"), Err(CommandError::Unknown("dance".into())));
    }
}
