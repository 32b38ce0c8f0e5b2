//! Domain error types.
//!
//! The `Display` text of each variant is sent to the client verbatim, so it is
//! written as a sentence for a human reader.

use thiserror::Error;

/// Reasons a `login` argument is not a valid display name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("Username is invalid: it must not be empty.")]
    Empty,

    #[error("Username is invalid: {0:?} is not allowed (use letters, digits and '_').")]
    InvalidCharacter(char),
}

/// Reasons the registry refused a login.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginError {
    /// Another live session holds the name, ignoring case.
    #[error("Username is already taken.")]
    NameTaken(String),

    /// The session already has a name.
    #[error("Already logged in as \"{0}\".")]
    AlreadyLoggedIn(String),

    /// The session is no longer in the registry.
    #[error("Connection is closing.")]
    Detached,
}

/// Reasons a chat message was not broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("You must log in first.")]
    NotLoggedIn,

    #[error("Connection is closing.")]
    Detached,
}
