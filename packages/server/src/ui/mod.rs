//! Network-facing layer: the TCP listener and the per-connection driver.

mod server;
mod session;
mod signal;

pub use server::Server;
pub use session::{CloseReason, Session};
pub use signal::shutdown_signal;
