//! Per-connection protocol state machine.
//!
//! [`SessionState::dispatch`] is a pure function from the current state and
//! one decoded command to the [`Action`] the connection driver must carry out.
//! Only a successful login, confirmed by the registry, moves the state forward
//! (see [`SessionState::authenticate`]).

use std::fmt;

use natter_shared::protocol::{ClientCommand, ServerEvent};
use uuid::Uuid;

use super::{ChatError, LoginError, UserName};

/// Identity of one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated(UserName),
    Closed,
}

/// What the connection driver has to do for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Ask the registry to claim this name.
    Login(UserName),
    /// Ask the registry to broadcast a chat line from this session.
    Chat(String),
    /// Leave the registry and close the connection.
    Logoff,
    /// Reply to this client only.
    Reply(ServerEvent),
    /// Nothing to do.
    Ignore,
}

impl SessionState {
    pub fn dispatch(&self, command: ClientCommand) -> Action {
        match (self, command) {
            (SessionState::Closed, _) => Action::Ignore,
            (_, ClientCommand::Logoff) => Action::Logoff,
            (_, ClientCommand::Unknown(verb)) => Action::Reply(ServerEvent::UnknownCommand(verb)),
            (SessionState::Unauthenticated, ClientCommand::Login(raw)) => {
                match UserName::parse(&raw) {
                    Ok(name) => Action::Login(name),
                    Err(e) => Action::Reply(ServerEvent::Notice(e.to_string())),
                }
            }
            (SessionState::Authenticated(name), ClientCommand::Login(_)) => Action::Reply(
                ServerEvent::Notice(LoginError::AlreadyLoggedIn(name.to_string()).to_string()),
            ),
            (SessionState::Unauthenticated, ClientCommand::Msg(_)) => {
                Action::Reply(ServerEvent::Notice(ChatError::NotLoggedIn.to_string()))
            }
            (SessionState::Authenticated(_), ClientCommand::Msg(body)) => Action::Chat(body),
        }
    }

    /// State after the registry accepted `name`.
    ///
    /// Only an unauthenticated session can become authenticated; any other
    /// state is returned unchanged.
    pub fn authenticate(self, name: UserName) -> Self {
        match self {
            SessionState::Unauthenticated => SessionState::Authenticated(name),
            other => other,
        }
    }

    pub fn name(&self) -> Option<&UserName> {
        match self {
            SessionState::Authenticated(name) => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticated(name: &str) -> SessionState {
        SessionState::Authenticated(UserName::parse(name).unwrap())
    }

    #[test]
    fn test_login_with_valid_name_asks_registry() {
        // テスト項目: 未認証状態で正しい名前の login はレジストリへの問い合わせになる
        // given (前提条件):
        let state = SessionState::Unauthenticated;

        // when (操作):
        let action = state.dispatch(ClientCommand::Login("alice".to_string()));

        // then (期待する結果):
        assert_eq!(action, Action::Login(UserName::parse("alice").unwrap()));
    }

    #[test]
    fn test_login_with_invalid_name_replies_rejection() {
        // テスト項目: 不正な名前の login は送信者への拒否応答になる
        // given (前提条件):
        let state = SessionState::Unauthenticated;

        // when (操作):
        let action = state.dispatch(ClientCommand::Login("bad name!".to_string()));

        // then (期待する結果):
        assert_eq!(
            action,
            Action::Reply(ServerEvent::Notice(
                "Username is invalid: ' ' is not allowed (use letters, digits and '_')."
                    .to_string()
            ))
        );
    }

    #[test]
    fn test_login_while_authenticated_is_rejected() {
        // テスト項目: 認証済みの状態での login は拒否される
        // given (前提条件):
        let state = authenticated("alice");

        // when (操作):
        let action = state.dispatch(ClientCommand::Login("bob".to_string()));

        // then (期待する結果):
        assert_eq!(
            action,
            Action::Reply(ServerEvent::Notice(
                "Already logged in as \"alice\".".to_string()
            ))
        );
    }

    #[test]
    fn test_msg_before_login_is_rejected() {
        // テスト項目: 未認証状態の msg はブロードキャストされず拒否応答になる
        // given (前提条件):
        let state = SessionState::Unauthenticated;

        // when (操作):
        let action = state.dispatch(ClientCommand::Msg("hello".to_string()));

        // then (期待する結果):
        assert_eq!(
            action,
            Action::Reply(ServerEvent::Notice("You must log in first.".to_string()))
        );
    }

    #[test]
    fn test_msg_after_login_is_broadcast() {
        // テスト項目: 認証済みの msg は本文そのままでブロードキャストされる
        // given (前提条件):
        let state = authenticated("alice");

        // when (操作):
        let action = state.dispatch(ClientCommand::Msg("hello  there".to_string()));

        // then (期待する結果):
        assert_eq!(action, Action::Chat("hello  there".to_string()));
    }

    #[test]
    fn test_logoff_is_accepted_in_any_open_state() {
        // テスト項目: logoff は未認証・認証済みのどちらでも受け付けられる
        // given (前提条件):
        let states = [SessionState::Unauthenticated, authenticated("alice")];

        // when (操作):
        let actions: Vec<_> = states
            .iter()
            .map(|s| s.dispatch(ClientCommand::Logoff))
            .collect();

        // then (期待する結果):
        assert_eq!(actions, vec![Action::Logoff, Action::Logoff]);
    }

    #[test]
    fn test_unknown_verb_replies_to_sender() {
        // テスト項目: 未知の動詞には送信者のみに応答する
        // given (前提条件):
        let state = SessionState::Unauthenticated;

        // when (操作):
        let action = state.dispatch(ClientCommand::Unknown("dance".to_string()));

        // then (期待する結果):
        assert_eq!(
            action,
            Action::Reply(ServerEvent::UnknownCommand("dance".to_string()))
        );
    }

    #[test]
    fn test_closed_session_ignores_commands() {
        // テスト項目: 終了したセッションはコマンドを無視する
        // given (前提条件):
        let state = SessionState::Closed;

        // when (操作):
        let action = state.dispatch(ClientCommand::Msg("hello".to_string()));

        // then (期待する結果):
        assert_eq!(action, Action::Ignore);
    }

    #[test]
    fn test_authenticate_only_from_unauthenticated() {
        // テスト項目: 認証への遷移は未認証状態からのみ発生する
        // given (前提条件):
        let bob = UserName::parse("bob").unwrap();

        // when (操作):
        let from_unauthenticated = SessionState::Unauthenticated.authenticate(bob.clone());
        let from_authenticated = authenticated("alice").authenticate(bob.clone());
        let from_closed = SessionState::Closed.authenticate(bob.clone());

        // then (期待する結果):
        assert_eq!(from_unauthenticated.name(), Some(&bob));
        assert_eq!(from_authenticated, authenticated("alice"));
        assert_eq!(from_closed, SessionState::Closed);
    }
}
