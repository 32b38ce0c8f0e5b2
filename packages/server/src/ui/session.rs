//! Per-connection driver.
//!
//! A [`Session`] owns one client connection. Its read loop is the only decoder
//! for the connection; a companion writer task is the only encoder and drains
//! the session's mailbox, which carries both the session's own replies and
//! everything other sessions broadcast to it.

use std::{fmt, io, net::SocketAddr, ops::ControlFlow, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use natter_shared::{
    codec::{Frame, LineCodec},
    protocol::{ClientCommand, ServerEvent},
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
    task::JoinHandle,
};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodecError};

use crate::domain::{Action, Detached, Outbox, SessionId, SessionRegistry, SessionState};

const LINE_TOO_LONG: &str = "Line too long.";

/// How long a closing session may spend flushing queued lines to its client.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a session ended.
#[derive(Debug)]
pub enum CloseReason {
    /// The client sent `logoff`.
    Logoff,
    /// The client closed its side of the connection.
    EndOfStream,
    /// Nothing was received within the configured idle timeout.
    IdleTimeout,
    ReadFailed(io::Error),
    /// The writer task stopped, so the client can no longer be reached.
    WriteFailed,
    /// The client stopped reading and its mailbox filled up.
    Evicted,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Logoff => f.write_str("logoff"),
            CloseReason::EndOfStream => f.write_str("connection closed by client"),
            CloseReason::IdleTimeout => f.write_str("idle timeout"),
            CloseReason::ReadFailed(e) => write!(f, "read failed: {}", e),
            CloseReason::WriteFailed => f.write_str("write failed"),
            CloseReason::Evicted => f.write_str("mailbox full"),
        }
    }
}

pub struct Session {
    id: SessionId,
    peer: SocketAddr,
    state: SessionState,
    registry: Arc<dyn SessionRegistry>,
    /// This session's own mailbox, used for direct replies.
    outbox: Outbox,
    idle_timeout: Option<Duration>,
}

impl Session {
    /// Create the driver for a session that is already attached to `registry`
    /// with a clone of `outbox`.
    pub fn new(
        id: SessionId,
        peer: SocketAddr,
        registry: Arc<dyn SessionRegistry>,
        outbox: Outbox,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            id,
            peer,
            state: SessionState::Unauthenticated,
            registry,
            outbox,
            idle_timeout,
        }
    }

    /// Serve the connection until it ends, then leave the registry.
    ///
    /// `inbox` is the receiving end of the session's mailbox.
    pub async fn run<S>(
        mut self,
        stream: S,
        inbox: mpsc::Receiver<ServerEvent>,
        max_line_length: usize,
    ) -> CloseReason
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let mut lines = FramedRead::new(reader, LineCodec::new(max_line_length));
        let mut pusher = pusher_loop(inbox, FramedWrite::new(writer, LineCodec::default()));

        let eviction = self.outbox.clone();

        let reason = tokio::select! {
            reason = self.read_loop(&mut lines) => reason,
            _ = &mut pusher => CloseReason::WriteFailed,
            _ = eviction.evicted() => CloseReason::Evicted,
        };

        self.close(&reason).await;

        // Dropping the last sender lets the writer drain what is queued and stop.
        drop(self);
        drop(eviction);
        match reason {
            CloseReason::WriteFailed => {}
            // The client is not reading, so there is nothing to flush into.
            CloseReason::Evicted => pusher.abort(),
            _ => {
                let abort = pusher.abort_handle();
                if tokio::time::timeout(FLUSH_TIMEOUT, pusher).await.is_err() {
                    abort.abort();
                }
            }
        }

        reason
    }

    async fn read_loop<R>(&mut self, lines: &mut FramedRead<R, LineCodec>) -> CloseReason
    where
        R: AsyncRead + Unpin,
    {
        loop {
            let next = match self.idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, lines.next()).await {
                    Ok(next) => next,
                    Err(_) => return CloseReason::IdleTimeout,
                },
                None => lines.next().await,
            };

            let line = match next {
                Some(Ok(Frame::Line(line))) => line,
                Some(Ok(Frame::Oversized)) => {
                    tracing::warn!("[{}] Discarded overlong line", self.peer);
                    self.reply(ServerEvent::Notice(LINE_TOO_LONG.to_string()));
                    continue;
                }
                Some(Err(LinesCodecError::Io(e))) => return CloseReason::ReadFailed(e),
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    // LineCodec reports this as Frame::Oversized.
                    continue;
                }
                None => return CloseReason::EndOfStream,
            };

            tracing::debug!("[{}] Received: {}", self.peer, line);

            let Some(command) = ClientCommand::parse(&line) else {
                continue;
            };
            if self.handle(command).await.is_break() {
                return CloseReason::Logoff;
            }
        }
    }

    async fn handle(&mut self, command: ClientCommand) -> ControlFlow<()> {
        match self.state.dispatch(command) {
            Action::Login(name) => match self.registry.login(self.id, name.clone()).await {
                Ok(()) => {
                    tracing::info!("[{}] Logged in as '{}'", self.peer, name);
                    self.state = std::mem::take(&mut self.state).authenticate(name);
                }
                Err(e) => {
                    tracing::warn!("[{}] Login as '{}' rejected: {}", self.peer, name, e);
                    self.reply(ServerEvent::Notice(e.to_string()));
                }
            },
            Action::Chat(body) => {
                if let Err(e) = self.registry.broadcast_message(self.id, body).await {
                    self.reply(ServerEvent::Notice(e.to_string()));
                }
            }
            Action::Reply(event) => {
                tracing::debug!("[{}] Rejected command: {}", self.peer, event);
                self.reply(event);
            }
            Action::Logoff => return ControlFlow::Break(()),
            Action::Ignore => {}
        }

        ControlFlow::Continue(())
    }

    fn reply(&self, event: ServerEvent) {
        // A closed mailbox means the writer is gone; the select in `run` handles that.
        if let Err(mpsc::error::TrySendError::Full(_)) = self.outbox.push(event) {
            tracing::warn!("[{}] Mailbox full, closing", self.peer);
            self.outbox.evict();
        }
    }

    async fn close(&mut self, reason: &CloseReason) {
        match self.registry.detach(self.id).await {
            Some(Detached {
                name: Some(name),
                notified,
            }) => tracing::info!(
                "[{}] '{}' disconnected ({}), {} user(s) notified",
                self.peer,
                name,
                reason,
                notified
            ),
            Some(Detached { name: None, .. }) => {
                tracing::info!("[{}] Disconnected before login ({})", self.peer, reason)
            }
            None => tracing::debug!(
                "[{}] Already removed from registry ({})",
                self.peer,
                reason
            ),
        }
        self.state = SessionState::Closed;
    }
}

/// Spawn the task that writes this session's mailbox to the client.
///
/// The task ends when every sender is dropped or when a write fails. In the
/// latter case the mailbox closes with it, which is how broadcasting sessions
/// learn that this client is gone.
fn pusher_loop<W>(
    mut inbox: mpsc::Receiver<ServerEvent>,
    mut sink: FramedWrite<W, LineCodec>,
) -> JoinHandle<()>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        while let Some(event) = inbox.recv().await {
            if let Err(e) = sink.send(event.to_string()).await {
                tracing::warn!("Failed to write to client: {}", e);
                break;
            }
        }
    })
}
