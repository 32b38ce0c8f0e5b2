//! Domain layer: names, the session state machine and the registry contract.

mod error;
mod name;
mod registry;
mod session;

pub use error::{ChatError, LoginError, NameError};
pub use name::UserName;
pub use registry::{DEFAULT_MAILBOX_CAPACITY, Detached, Outbox, SessionInfo, SessionRegistry};
#[cfg(test)]
pub use registry::MockSessionRegistry;
pub use session::{Action, SessionId, SessionState};
