//! Line-based TCP chat relay.
//!
//! Clients log in with a unique display name, then every chat line and every
//! presence change is fanned out to all logged-in clients. See
//! [`natter_shared::protocol`] for the wire format.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;

pub mod config;
pub mod error;

pub use config::ServerConfig;
pub use error::ServerError;
pub use ui::Server;
