//! Line driver for the terminal client.
//!
//! Implements the [`Driver`] trait over stdin lines, stdout text and one
//! WebSocket from [`quizwire_client::transport`].

use std::{
    collections::VecDeque,
    io::{self, Write},
    time::Duration,
};

use quizwire_app::{Driver, SessionEvent, SessionSnapshot, TransportEvent};
use quizwire_client::transport::{self, ConnectedSocket, SocketEvent, TransportError};
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc::{self, error::TryRecvError},
};

use crate::{
    command::{self, Command},
    render::Renderer,
};

/// How long `poll_event` waits for input before reporting a tick.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Line driver errors.
#[derive(Debug, Error)]
pub enum LineError {
    /// I/O error writing to the terminal.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Text sent while no socket is open.
    #[error("not connected")]
    NotConnected,
}

/// Driver reading commands from stdin and writing to stdout.
pub struct LineDriver {
    url: String,
    credential: String,
    input: mpsc::Receiver<String>,
    pending: VecDeque<SessionEvent>,
    socket: Option<ConnectedSocket>,
    renderer: Renderer,
}

impl LineDriver {
    /// Driver connecting to `url` and reading lines from stdin.
    ///
    /// Spawns the stdin reader, so it must be called inside a tokio
    /// runtime.
    pub fn new(url: impl Into<String>, credential: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        });
        Self::with_input(url, credential, rx)
    }

    /// Driver reading lines from `input`.
    pub fn with_input(
        url: impl Into<String>,
        credential: impl Into<String>,
        input: mpsc::Receiver<String>,
    ) -> Self {
        Self {
            url: url.into(),
            credential: credential.into(),
            input,
            pending: VecDeque::new(),
            socket: None,
            renderer: Renderer::new(),
        }
    }

    /// Queue an event ahead of user input.
    pub fn queue(&mut self, event: SessionEvent) {
        self.pending.push_back(event);
    }

    /// Map an input line to a session event.
    ///
    /// Parse errors are written to stdout and yield `None`.
    fn handle_line(&mut self, line: &str) -> Result<Option<SessionEvent>, LineError> {
        let command = match command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(None),
            Err(e) => {
                write_lines(&[format!("! {e}")])?;
                return Ok(None);
            },
        };

        let event = match command {
            Command::Connect => SessionEvent::Connect { credential: self.credential.clone() },
            Command::Disconnect => SessionEvent::Disconnect,
            Command::Join(room_id) => SessionEvent::EnterRoom { room_id },
            Command::Leave => SessionEvent::LeaveRoom,
            Command::Start => SessionEvent::StartGame,
            Command::Answer(option) => SessionEvent::SubmitAnswer { option },
            Command::Pick(n) => {
                let option = n.checked_sub(1).and_then(|i| self.renderer.options().get(i));
                match option {
                    Some(option) => SessionEvent::SubmitAnswer { option: option.clone() },
                    None => {
                        write_lines(&[format!("! no option {n}")])?;
                        return Ok(None);
                    },
                }
            },
            Command::ChatView(open) => SessionEvent::ChatViewed(open),
            Command::Say(text) => SessionEvent::SendChat { text },
            Command::Quit => SessionEvent::Quit,
        };
        Ok(Some(event))
    }

    fn drop_socket(&mut self) {
        if let Some(socket) = self.socket.take() {
            socket.stop();
        }
    }
}

fn write_lines(lines: &[String]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()
}

impl Driver for LineDriver {
    type Error = LineError;

    async fn poll_event(&mut self) -> Result<Option<SessionEvent>, Self::Error> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }

        tokio::select! {
            biased;

            line = self.input.recv() => match line {
                Some(line) => self.handle_line(&line),
                // stdin closed
                None => Ok(Some(SessionEvent::Quit)),
            },

            () = tokio::time::sleep(POLL_INTERVAL) => Ok(None),
        }
    }

    async fn open_transport(&mut self) -> Result<(), Self::Error> {
        self.drop_socket();
        let socket = transport::connect(&self.url).await?;
        self.socket = Some(socket);
        Ok(())
    }

    async fn send_text(&mut self, text: String) -> Result<(), Self::Error> {
        let socket = self.socket.as_ref().ok_or(LineError::NotConnected)?;
        socket.send(text).await?;
        Ok(())
    }

    async fn recv_event(&mut self) -> Option<TransportEvent> {
        let socket = self.socket.as_mut()?;
        match socket.from_server.try_recv() {
            Ok(SocketEvent::Text(text)) => Some(TransportEvent::Text(text)),
            Ok(SocketEvent::Closed(reason)) => {
                self.drop_socket();
                Some(TransportEvent::Closed { reason })
            },
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.drop_socket();
                Some(TransportEvent::Closed { reason: "socket task exited".to_string() })
            },
        }
    }

    fn close_transport(&mut self) {
        self.drop_socket();
    }

    fn render(&mut self, snapshot: &SessionSnapshot) -> Result<(), Self::Error> {
        let lines = self.renderer.render(snapshot);
        if !lines.is_empty() {
            write_lines(&lines)?;
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.drop_socket();
    }
}

impl Drop for LineDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
