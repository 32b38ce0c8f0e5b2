//! Server configuration.

use std::time::Duration;

use natter_shared::codec::{DEFAULT_MAX_LINE_LENGTH, DEFAULT_PORT};

use crate::domain::DEFAULT_MAILBOX_CAPACITY;

/// Runtime settings for [`crate::Server`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to bind to; 0 picks an ephemeral port
    pub port: u16,
    /// Longest accepted inbound line, in bytes
    pub max_line_length: usize,
    /// Close sessions that send nothing for this long. `None` waits forever.
    pub idle_timeout: Option<Duration>,
    /// Undelivered events a session may have queued before it is evicted as a
    /// client that stopped reading. Also caps how many users a newcomer can be
    /// greeted with.
    pub mailbox_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            idle_timeout: None,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
