//! TCP listener.

use std::{future::Future, io, net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;

use crate::{
    config::ServerConfig,
    domain::{Outbox, SessionId, SessionRegistry},
    error::ServerError,
    infrastructure::registry::InMemorySessionRegistry,
};

use super::{session::Session, signal::shutdown_signal};

/// Chat relay server
///
/// Binding and serving are separate steps so that callers can learn the actual
/// address (useful with port 0) before accepting connections.
///
/// # Example
///
/// ```no_run
/// # async fn run() -> Result<(), natter_server::ServerError> {
/// use natter_server::{Server, ServerConfig};
///
/// let server = Server::bind(ServerConfig::default()).await?;
/// println!("listening on {}", server.local_addr()?);
/// server.run().await;
/// # Ok(())
/// # }
/// ```
pub struct Server {
    listener: TcpListener,
    registry: Arc<dyn SessionRegistry>,
    config: ServerConfig,
}

impl Server {
    /// Bind to `config.host:config.port` with a fresh in-memory registry.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        Self::bind_with_registry(config, Arc::new(InMemorySessionRegistry::new())).await
    }

    pub async fn bind_with_registry(
        config: ServerConfig,
        registry: Arc<dyn SessionRegistry>,
    ) -> Result<Self, ServerError> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self {
            listener,
            registry,
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared handle to the session registry.
    pub fn registry(&self) -> Arc<dyn SessionRegistry> {
        self.registry.clone()
    }

    /// Accept connections until Ctrl+C or SIGTERM.
    pub async fn run(self) {
        self.run_until(shutdown_signal()).await
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Sessions already running are not interrupted by shutdown; they end with
    /// the runtime.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        match self.listener.local_addr() {
            Ok(addr) => tracing::info!("Chat server listening on {}", addr),
            Err(e) => tracing::warn!("Chat server listening on unknown address: {}", e),
        }

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_session(stream, peer).await,
                    Err(e) => {
                        // One failed accept must not stop the others.
                        tracing::warn!("Failed to accept connection: {}", e);
                    }
                },
                _ = &mut shutdown => break,
            }
        }

        tracing::info!("Server shutdown complete");
    }

    async fn spawn_session(&self, stream: tokio::net::TcpStream, peer: SocketAddr) {
        let id = SessionId::generate();
        let (outbox, inbox) = Outbox::channel(self.config.mailbox_capacity);

        self.registry.attach(id, outbox.clone()).await;
        tracing::info!("Accepted connection from {} (session {})", peer, id);

        let session = Session::new(
            id,
            peer,
            self.registry.clone(),
            outbox,
            self.config.idle_timeout,
        );
        let max_line_length = self.config.max_line_length;
        tokio::spawn(async move {
            let reason = session.run(stream, inbox, max_line_length).await;
            tracing::debug!("Session {} ended: {}", id, reason);
        });
    }
}
