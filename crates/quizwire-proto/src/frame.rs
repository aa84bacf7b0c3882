//! STOMP 1.2 text frames.
//!
//! A frame on the wire is:
//!
//! ```text
//! COMMAND
//! name:value
//! name:value
//!
//! body^@
//! ```
//!
//! where `^@` is the NUL byte. A message made only of end-of-line characters
//! is a heartbeat and carries no frame.
//!
//! # Invariants
//!
//! - Header order is preserved. When a header name repeats, the first
//!   occurrence wins ([`Frame::header`]).
//! - Header names and values are escaped on every command except `CONNECT`
//!   and `CONNECTED`, which STOMP exempts for 1.0 compatibility.

use std::fmt;

use crate::errors::{ProtocolError, Result};

/// Largest frame accepted from the wire (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// STOMP protocol version negotiated on CONNECT.
pub const STOMP_VERSION: &str = "1.2";

/// STOMP frame commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Client opens a session.
    Connect,
    /// Alias of CONNECT defined by STOMP 1.2.
    Stomp,
    /// Server accepts a session.
    Connected,
    /// Client publishes to a destination.
    Send,
    /// Client subscribes to a topic.
    Subscribe,
    /// Client drops a subscription.
    Unsubscribe,
    /// Server delivers a message for a subscription.
    Message,
    /// Server acknowledges a frame that requested a receipt.
    Receipt,
    /// Server reports an error and closes the session.
    Error,
    /// Client closes the session.
    Disconnect,
}

impl Command {
    /// Command as written on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Stomp => "STOMP",
            Self::Connected => "CONNECTED",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
            Self::Disconnect => "DISCONNECT",
        }
    }

    /// Parse a command line. `None` if the command is unknown.
    pub fn parse(line: &str) -> Option<Self> {
        let command = match line {
            "CONNECT" => Self::Connect,
            "STOMP" => Self::Stomp,
            "CONNECTED" => Self::Connected,
            "SEND" => Self::Send,
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            "MESSAGE" => Self::Message,
            "RECEIPT" => Self::Receipt,
            "ERROR" => Self::Error,
            "DISCONNECT" => Self::Disconnect,
            _ => return None,
        };
        Some(command)
    }

    /// Whether header escaping applies to this command.
    fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command.
    pub command: Command,
    /// Headers in wire order.
    pub headers: Vec<(String, String)>,
    /// Frame body. JSON text for every frame this client exchanges.
    pub body: String,
}

impl Frame {
    /// Create a frame with no headers and an empty body.
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self { command, headers: Vec::new(), body: String::new() }
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// CONNECT frame carrying a bearer credential and heart-beat offer.
    ///
    /// `heartbeat` is `(outgoing_ms, incoming_ms)` as defined by the STOMP
    /// `heart-beat` header.
    #[must_use]
    pub fn connect(credential: &str, host: &str, heartbeat: (u64, u64)) -> Self {
        Self::new(Command::Connect)
            .with_header("accept-version", STOMP_VERSION)
            .with_header("host", host)
            .with_header("heart-beat", format!("{},{}", heartbeat.0, heartbeat.1))
            .with_header("Authorization", format!("Bearer {credential}"))
    }

    /// SUBSCRIBE frame for `destination` under subscription `id`.
    #[must_use]
    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(Command::Subscribe)
            .with_header("id", id)
            .with_header("destination", destination)
            .with_header("ack", "auto")
    }

    /// UNSUBSCRIBE frame for subscription `id`.
    #[must_use]
    pub fn unsubscribe(id: &str) -> Self {
        Self::new(Command::Unsubscribe).with_header("id", id)
    }

    /// SEND frame publishing a JSON body to `destination`.
    #[must_use]
    pub fn send(destination: &str, json_body: impl Into<String>) -> Self {
        Self::new(Command::Send)
            .with_header("destination", destination)
            .with_header("content-type", "application/json")
            .with_body(json_body)
    }

    /// DISCONNECT frame.
    #[must_use]
    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect)
    }

    /// First value of header `name`. `None` if absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Value of a header the frame cannot be interpreted without.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::MissingHeader` if the header is absent
    pub fn required_header(&self, name: &'static str) -> Result<&str> {
        self.header(name)
            .ok_or(ProtocolError::MissingHeader { command: self.command.as_str(), header: name })
    }

    /// Parse the `heart-beat` header into `(cx, cy)` milliseconds.
    ///
    /// Absent or malformed headers read as `(0, 0)`, which STOMP defines as
    /// "no heartbeating".
    pub fn heartbeat(&self) -> (u64, u64) {
        let Some(value) = self.header("heart-beat") else {
            return (0, 0);
        };
        let mut parts = value.split(',').map(|p| p.trim().parse::<u64>().ok());
        match (parts.next().flatten(), parts.next().flatten()) {
            (Some(cx), Some(cy)) => (cx, cy),
            _ => (0, 0),
        }
    }

    /// Encode the frame into its wire text.
    ///
    /// Frames with a body carry a `content-length` header so bodies
    /// containing NUL survive the round trip.
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());

        out.push_str(self.command.as_str());
        out.push('\n');

        for (name, value) in &self.headers {
            if escape {
                push_escaped(&mut out, name);
                out.push(':');
                push_escaped(&mut out, value);
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }

        if !self.body.is_empty() && self.header("content-length").is_none() {
            out.push_str("content-length:");
            out.push_str(&self.body.len().to_string());
            out.push('\n');
        }

        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }
}

/// One WebSocket message worth of STOMP data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    /// End-of-line keep-alive.
    Heartbeat,
    /// A complete frame.
    Frame(Frame),
}

impl WireMessage {
    /// Wire text of a heartbeat.
    pub const HEARTBEAT: &'static str = "\n";

    /// Decode one message.
    ///
    /// Leading end-of-line characters (heartbeats that arrived in the same
    /// message as a frame) are skipped. Trailing end-of-line characters after
    /// the NUL terminator are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` describing the first structural problem found.
    pub fn decode(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Err(ProtocolError::Empty);
        }

        if input.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge { size: input.len(), max: MAX_FRAME_SIZE });
        }

        let text = input.trim_start_matches(['\r', '\n']);
        if text.is_empty() {
            return Ok(Self::Heartbeat);
        }

        let (head, rest) = split_head(text).ok_or(ProtocolError::UnterminatedHeaders)?;
        let mut lines = head.lines();

        let command_line = lines.next().unwrap_or_default();
        let command = Command::parse(command_line)
            .ok_or_else(|| ProtocolError::UnknownCommand(command_line.to_string()))?;

        let mut headers = Vec::new();
        for line in lines {
            let (name, value) =
                line.split_once(':').ok_or_else(|| ProtocolError::MalformedHeader(line.into()))?;
            if command.escapes_headers() {
                headers.push((unescape(name)?, unescape(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let content_length = headers
            .iter()
            .find(|(k, _)| k == "content-length")
            .map(|(_, v)| {
                v.trim()
                    .parse::<usize>()
                    .map_err(|_| ProtocolError::InvalidContentLength(v.clone()))
            })
            .transpose()?;

        let body = match content_length {
            Some(len) => {
                let body = rest.get(..len).ok_or_else(|| {
                    ProtocolError::InvalidContentLength(format!("{len} exceeds body"))
                })?;
                if !rest[len..].starts_with('\0') {
                    return Err(ProtocolError::MissingTerminator);
                }
                body
            },
            None => {
                let end = rest.find('\0').ok_or(ProtocolError::MissingTerminator)?;
                &rest[..end]
            },
        };

        Ok(Self::Frame(Frame { command, headers, body: body.to_string() }))
    }

    /// Decode a binary WebSocket message.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::NonUtf8` if the bytes are not UTF-8
    /// - anything [`WireMessage::decode`] returns
    pub fn decode_bytes(input: &[u8]) -> Result<Self> {
        if input.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge { size: input.len(), max: MAX_FRAME_SIZE });
        }
        let text = std::str::from_utf8(input).map_err(|_| ProtocolError::NonUtf8)?;
        Self::decode(text)
    }

    /// Encode into wire text.
    pub fn encode(&self) -> String {
        match self {
            Self::Heartbeat => Self::HEARTBEAT.to_string(),
            Self::Frame(frame) => frame.encode(),
        }
    }
}

/// Split `text` at the blank line ending the header section.
///
/// Returns `(head, body_and_terminator)`. `head` still ends with the newline
/// of its last line.
fn split_head(text: &str) -> Option<(&str, &str)> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let is_blank = line.trim_end_matches(['\r', '\n']).is_empty() && line.ends_with('\n');
        if is_blank && offset > 0 {
            return Some((&text[..offset], &text[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

fn push_escaped(out: &mut String, raw: &str) {
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
}

fn unescape(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(ProtocolError::InvalidEscape(raw.to_string())),
        }
    }
    Ok(out)
}
