//! Interactive terminal session.

use chrono::Local;
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use crate::{
    client::{ChatClient, CommandWriter, EventReader},
    error::ClientError,
    formatter::MessageFormatter,
    ui::redisplay_prompt,
};

/// Typed on its own line to leave the chat.
pub const QUIT_COMMAND: &str = "/quit";

/// What the user typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Message(String),
    Quit,
}

impl Input {
    /// Interpret one line from the prompt. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            None
        } else if line == QUIT_COMMAND {
            Some(Input::Quit)
        } else {
            Some(Input::Message(line.to_string()))
        }
    }
}

/// Connect, log in as `name`, then relay terminal input and server events
/// until the user quits or the server goes away.
pub async fn run_client_session(addr: &str, name: &str) -> Result<(), ClientError> {
    let mut client = ChatClient::connect(addr).await?;
    client.login(name).await?;

    tracing::info!("Connected to chat server at {}", addr);
    println!(
        "\nYou are '{}'. Type messages and press Enter to send. Type {} or press Ctrl+C to exit.\n",
        name, QUIT_COMMAND
    );

    let (events, commands) = client.into_split();

    let mut read_task = tokio::spawn(print_events(events, name.to_string()));
    let mut write_task = tokio::spawn(send_input(commands, read_input(name.to_string())));

    // If any one of the tasks completes, abort the other
    tokio::select! {
        read_result = &mut read_task => {
            write_task.abort();
            read_result.unwrap_or(Err(ClientError::Disconnected))?;
            Err(ClientError::Disconnected)
        }
        write_result = &mut write_task => {
            read_task.abort();
            write_result.unwrap_or(Err(ClientError::Disconnected))
        }
    }
}

async fn print_events(mut events: EventReader, name: String) -> Result<(), ClientError> {
    while let Some(event) = events.next_event().await? {
        print!("{}", MessageFormatter::format_event(&event, &name, Local::now()));
        redisplay_prompt(&name);
    }

    tracing::info!("Server closed the connection");
    Ok(())
}

async fn send_input(
    mut commands: CommandWriter,
    mut input_rx: mpsc::UnboundedReceiver<Input>,
) -> Result<(), ClientError> {
    while let Some(input) = input_rx.recv().await {
        match input {
            Input::Message(body) => commands.msg(&body).await?,
            Input::Quit => break,
        }
    }

    // Reached on /quit, Ctrl+C and Ctrl+D alike.
    commands.logoff().await
}

/// Read prompt lines on a blocking thread, since rustyline is synchronous.
fn read_input(name: String) -> mpsc::UnboundedReceiver<Input> {
    let (input_tx, input_rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        let prompt = format!("{}> ", name);

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let Some(input) = Input::parse(&line) else {
                        continue;
                    };
                    rl.add_history_entry(line.trim()).ok();
                    let quit = input == Input::Quit;
                    if input_tx.send(input).is_err() || quit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    input_rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_parse() {
        // テスト項目: 入力行がメッセージ・終了・空行に分類される
        // given (前提条件):
        let lines = ["  hello there ", "/quit", "   ", "/quit now"];

        // when (操作):
        let inputs: Vec<_> = lines.iter().map(|l| Input::parse(l)).collect();

        // then (期待する結果):
        assert_eq!(
            inputs,
            vec![
                Some(Input::Message("hello there".to_string())),
                Some(Input::Quit),
                None,
                Some(Input::Message("/quit now".to_string())),
            ]
        );
    }
}
