//! Client for the natter chat relay.
//!
//! [`ChatClient`] speaks the line protocol over TCP; the `natter-client`
//! binary wraps it in an interactive terminal session.

pub mod client;
pub mod error;
pub mod formatter;
pub mod session;
pub mod ui;

pub use client::{ChatClient, CommandWriter, EventReader};
pub use error::ClientError;
