//! Protocol client.

use std::collections::VecDeque;

use futures_util::{SinkExt, StreamExt};
use natter_shared::{
    codec::{DEFAULT_MAX_LINE_LENGTH, Frame, LineCodec},
    protocol::{ClientCommand, ServerEvent},
};
use tokio::net::{
    TcpStream, ToSocketAddrs,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
};
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::error::ClientError;

/// Server lines carry a name and a body on top of what a client may send.
const MAX_SERVER_LINE_LENGTH: usize = DEFAULT_MAX_LINE_LENGTH * 2;

/// Connection to a chat relay.
///
/// ```no_run
/// # async fn demo() -> Result<(), natter_client::ClientError> {
/// use natter_client::ChatClient;
///
/// let mut client = ChatClient::connect("127.0.0.1:8818").await?;
/// client.login("alice").await?;
/// client.msg("hello").await?;
/// while let Some(event) = client.next_event().await? {
///     println!("{}", event);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ChatClient {
    events: EventReader,
    commands: CommandWriter,
}

/// Receiving half of a [`ChatClient`].
pub struct EventReader {
    lines: FramedRead<OwnedReadHalf, LineCodec>,
    /// Chat traffic that arrived while waiting for a login verdict.
    pending: VecDeque<ServerEvent>,
}

/// Sending half of a [`ChatClient`].
pub struct CommandWriter {
    sink: FramedWrite<OwnedWriteHalf, LineCodec>,
}

impl ChatClient {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();

        Ok(Self {
            events: EventReader {
                lines: FramedRead::new(reader, LineCodec::new(MAX_SERVER_LINE_LENGTH)),
                pending: VecDeque::new(),
            },
            commands: CommandWriter {
                sink: FramedWrite::new(writer, LineCodec::default()),
            },
        })
    }

    /// Send `login <name>` and wait for the verdict.
    ///
    /// A notice in reply is returned as [`ClientError::LoginRejected`]
    /// carrying the server's text; the connection stays usable for another
    /// attempt. Chat and presence events that arrive before the verdict are
    /// kept and handed out by later [`ChatClient::next_event`] calls.
    pub async fn login(&mut self, name: &str) -> Result<(), ClientError> {
        self.commands
            .send(ClientCommand::Login(name.to_string()))
            .await?;

        loop {
            match self.events.read_event().await? {
                Some(ServerEvent::LoginOk) => return Ok(()),
                Some(ServerEvent::Notice(text)) => return Err(ClientError::LoginRejected(text)),
                Some(reply @ ServerEvent::UnknownCommand(_)) => {
                    return Err(ClientError::LoginRejected(reply.to_string()));
                }
                Some(traffic) => self.events.pending.push_back(traffic),
                None => return Err(ClientError::Disconnected),
            }
        }
    }

    pub async fn msg(&mut self, body: &str) -> Result<(), ClientError> {
        self.commands.msg(body).await
    }

    pub async fn logoff(&mut self) -> Result<(), ClientError> {
        self.commands.logoff().await
    }

    pub async fn send(&mut self, command: ClientCommand) -> Result<(), ClientError> {
        self.commands.send(command).await
    }

    /// Next event from the server, or `None` once the server closed the connection.
    pub async fn next_event(&mut self) -> Result<Option<ServerEvent>, ClientError> {
        self.events.next_event().await
    }

    pub fn into_split(self) -> (EventReader, CommandWriter) {
        (self.events, self.commands)
    }
}

impl EventReader {
    pub async fn next_event(&mut self) -> Result<Option<ServerEvent>, ClientError> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }
        self.read_event().await
    }

    async fn read_event(&mut self) -> Result<Option<ServerEvent>, ClientError> {
        while let Some(frame) = self.lines.next().await {
            match frame? {
                Frame::Line(line) => return Ok(Some(ServerEvent::parse(&line))),
                Frame::Oversized => tracing::warn!("Skipped an overlong line from the server"),
            }
        }

        Ok(None)
    }
}

impl CommandWriter {
    pub async fn send(&mut self, command: ClientCommand) -> Result<(), ClientError> {
        self.sink.send(command.to_string()).await?;
        Ok(())
    }

    pub async fn msg(&mut self, body: &str) -> Result<(), ClientError> {
        self.send(ClientCommand::Msg(body.to_string())).await
    }

    pub async fn logoff(&mut self) -> Result<(), ClientError> {
        self.send(ClientCommand::Logoff).await
    }
}
