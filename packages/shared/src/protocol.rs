//! Line protocol spoken between chat clients and the relay.
//!
//! Every line is `<verb>[ <args>]`. The verb is matched ASCII
//! case-insensitively and the arguments are everything after the first space,
//! kept verbatim.
//!
//! Client to server:
//!
//! ```text
//! login <name>
//! msg <body>
//! logoff
//! ```
//!
//! Server to client:
//!
//! ```text
//! login ok
//! online <name>
//! offline <name>
//! msg <name> <body>
//! Unknown command: "<verb>"
//! ```
//!
//! Any other server line is a human-readable notice.

use std::fmt;

/// A command sent by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// `login <name>`: the raw, unvalidated name argument.
    Login(String),
    /// `msg <body>`: the rest of the line after the verb.
    Msg(String),
    /// `logoff`: any argument is ignored.
    Logoff,
    /// Any other verb, in the case the client sent it. Arguments after the
    /// verb are not kept, so encoding writes the verb alone.
    Unknown(String),
}

impl ClientCommand {
    /// Decode one line.
    ///
    /// Returns `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        if line.trim().is_empty() {
            return None;
        }

        let (verb, rest) = split_verb(line);

        let command = match verb.to_ascii_lowercase().as_str() {
            "login" => ClientCommand::Login(rest.to_string()),
            "msg" => ClientCommand::Msg(rest.to_string()),
            "logoff" => ClientCommand::Logoff,
            _ => ClientCommand::Unknown(verb.to_string()),
        };

        Some(command)
    }
}

impl fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientCommand::Login(name) => write!(f, "login {}", name),
            ClientCommand::Msg(body) => write!(f, "msg {}", body),
            ClientCommand::Logoff => f.write_str("logoff"),
            ClientCommand::Unknown(verb) => f.write_str(verb),
        }
    }
}

/// An event sent by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// The preceding `login` was accepted.
    LoginOk,
    /// A user is present.
    Online(String),
    /// A user departed.
    Offline(String),
    /// A chat line from `from`.
    Message { from: String, body: String },
    /// Reply to a verb the server does not know.
    UnknownCommand(String),
    /// Free-form text such as a login rejection.
    Notice(String),
}

const UNKNOWN_COMMAND_PREFIX: &str = "Unknown command: \"";

impl ServerEvent {
    /// Decode one line received from the server.
    ///
    /// Lines that are not one of the structured events become [`ServerEvent::Notice`].
    pub fn parse(line: &str) -> Self {
        if line.eq_ignore_ascii_case("login ok") {
            return ServerEvent::LoginOk;
        }

        if let Some(verb) = line
            .strip_prefix(UNKNOWN_COMMAND_PREFIX)
            .and_then(|rest| rest.strip_suffix('"'))
        {
            return ServerEvent::UnknownCommand(verb.to_string());
        }

        let (verb, rest) = split_verb(line);

        match verb.to_ascii_lowercase().as_str() {
            "online" if !rest.is_empty() => ServerEvent::Online(rest.to_string()),
            "offline" if !rest.is_empty() => ServerEvent::Offline(rest.to_string()),
            "msg" if !rest.is_empty() => {
                let (from, body) = rest.split_once(' ').unwrap_or((rest, ""));
                ServerEvent::Message {
                    from: from.to_string(),
                    body: body.to_string(),
                }
            }
            _ => ServerEvent::Notice(line.to_string()),
        }
    }
}

impl fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerEvent::LoginOk => f.write_str("login ok"),
            ServerEvent::Online(name) => write!(f, "online {}", name),
            ServerEvent::Offline(name) => write!(f, "offline {}", name),
            ServerEvent::Message { from, body } => write!(f, "msg {} {}", from, body),
            ServerEvent::UnknownCommand(verb) => write!(f, "{}{}\"", UNKNOWN_COMMAND_PREFIX, verb),
            ServerEvent::Notice(text) => f.write_str(text),
        }
    }
}

fn split_verb(line: &str) -> (&str, &str) {
    line.split_once(' ').unwrap_or((line, ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_keeps_raw_argument() {
        // テスト項目: login の引数は検証せずそのまま保持される
        // given (前提条件):
        let line = "login bad name!";

        // when (操作):
        let command = ClientCommand::parse(line);

        // then (期待する結果):
        assert_eq!(command, Some(ClientCommand::Login("bad name!".to_string())));
    }

    #[test]
    fn test_parse_login_without_argument() {
        // テスト項目: 引数なしの login は空の名前として扱われる
        // given (前提条件):
        let line = "login";

        // when (操作):
        let command = ClientCommand::parse(line);

        // then (期待する結果):
        assert_eq!(command, Some(ClientCommand::Login(String::new())));
    }

    #[test]
    fn test_parse_verb_is_case_insensitive() {
        // テスト項目: 動詞は大文字小文字を区別しない
        // given (前提条件):
        let lines = ["MSG hi", "Msg hi", "msg hi"];

        // when (操作):
        let commands: Vec<_> = lines.iter().map(|l| ClientCommand::parse(l)).collect();

        // then (期待する結果):
        for command in commands {
            assert_eq!(command, Some(ClientCommand::Msg("hi".to_string())));
        }
    }

    #[test]
    fn test_parse_msg_preserves_spaces_in_body() {
        // テスト項目: msg の本文は最初の空白以降がそのまま保持される
        // given (前提条件):
        let line = "msg hello  there, world ";

        // when (操作):
        let command = ClientCommand::parse(line);

        // then (期待する結果):
        assert_eq!(
            command,
            Some(ClientCommand::Msg("hello  there, world ".to_string()))
        );
    }

    #[test]
    fn test_parse_logoff_ignores_arguments() {
        // テスト項目: logoff の引数は無視される
        // given (前提条件):
        let line = "logoff alice";

        // when (操作):
        let command = ClientCommand::parse(line);

        // then (期待する結果):
        assert_eq!(command, Some(ClientCommand::Logoff));
    }

    #[test]
    fn test_parse_unknown_verb_keeps_original_case() {
        // テスト項目: 未知の動詞は送信されたままの表記で保持される
        // given (前提条件):
        let line = "Shout hello";

        // when (操作):
        let command = ClientCommand::parse(line);

        // then (期待する結果):
        assert_eq!(command, Some(ClientCommand::Unknown("Shout".to_string())));
    }

    #[test]
    fn test_client_command_encoding_writes_only_the_verb_for_unknown() {
        // テスト項目: クライアントコマンドの行表現。未知のコマンドは動詞だけが書き出される
        // given (前提条件):
        let commands = [
            ClientCommand::Login("alice".to_string()),
            ClientCommand::Msg("hi  there".to_string()),
            ClientCommand::Logoff,
            ClientCommand::Unknown("Shout".to_string()),
        ];

        // when (操作):
        let lines: Vec<String> = commands.iter().map(ToString::to_string).collect();

        // then (期待する結果):
        assert_eq!(lines, vec!["login alice", "msg hi  there", "logoff", "Shout"]);
    }

    #[test]
    fn test_parse_blank_line() {
        // テスト項目: 空行はコマンドにならない
        // given (前提条件):
        let lines = ["", "   "];

        // when (操作):
        let commands: Vec<_> = lines.iter().map(|l| ClientCommand::parse(l)).collect();

        // then (期待する結果):
        assert_eq!(commands, vec![None, None]);
    }

    #[test]
    fn test_server_event_encoding() {
        // テスト項目: サーバーイベントがプロトコル通りの行に変換される
        // given (前提条件):
        let events = vec![
            ServerEvent::LoginOk,
            ServerEvent::Online("alice".to_string()),
            ServerEvent::Offline("bob".to_string()),
            ServerEvent::Message {
                from: "alice".to_string(),
                body: "hello world".to_string(),
            },
            ServerEvent::UnknownCommand("shout".to_string()),
            ServerEvent::Notice("Username is already taken.".to_string()),
        ];

        // when (操作):
        let lines: Vec<String> = events.iter().map(ToString::to_string).collect();

        // then (期待する結果):
        assert_eq!(
            lines,
            vec![
                "login ok",
                "online alice",
                "offline bob",
                "msg alice hello world",
                "Unknown command: \"shout\"",
                "Username is already taken.",
            ]
        );
    }

    #[test]
    fn test_server_event_parse_message_with_spaces() {
        // テスト項目: msg 行の送信者と本文が分離され、本文の空白が保持される
        // given (前提条件):
        let line = "msg bob hi  there";

        // when (操作):
        let event = ServerEvent::parse(line);

        // then (期待する結果):
        assert_eq!(
            event,
            ServerEvent::Message {
                from: "bob".to_string(),
                body: "hi  there".to_string(),
            }
        );
    }

    #[test]
    fn test_server_event_parse_presence_and_replies() {
        // テスト項目: 在席通知と応答行が正しく解釈される
        // given (前提条件):
        let lines = [
            "login ok",
            "online alice",
            "offline alice",
            "Unknown command: \"dance\"",
        ];

        // when (操作):
        let events: Vec<_> = lines.iter().map(|l| ServerEvent::parse(l)).collect();

        // then (期待する結果):
        assert_eq!(
            events,
            vec![
                ServerEvent::LoginOk,
                ServerEvent::Online("alice".to_string()),
                ServerEvent::Offline("alice".to_string()),
                ServerEvent::UnknownCommand("dance".to_string()),
            ]
        );
    }

    #[test]
    fn test_server_event_parse_unstructured_line_is_notice() {
        // テスト項目: 構造化されていない行は通知として扱われる
        // given (前提条件):
        let line = "Username is invalid: it must not be empty.";

        // when (操作):
        let event = ServerEvent::parse(line);

        // then (期待する結果):
        assert_eq!(event, ServerEvent::Notice(line.to_string()));
    }
}
