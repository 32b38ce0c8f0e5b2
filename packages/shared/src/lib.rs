//! Shared building blocks for the natter chat relay.
//!
//! The server and the client agree on nothing but the line protocol defined in
//! [`protocol`], framed by the codec in [`codec`].

pub mod codec;
pub mod logger;
pub mod protocol;
