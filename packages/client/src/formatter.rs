//! Message formatting utilities for client display.

use chrono::{DateTime, Local};
use natter_shared::protocol::ServerEvent;

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format one server event for the terminal
    ///
    /// # Arguments
    ///
    /// * `event` - The event received from the server
    /// * `own_name` - The name this client logged in with (to mark as "me")
    /// * `received_at` - When the event arrived
    ///
    /// # Returns
    ///
    /// A formatted string starting with a newline, so it does not collide with
    /// a prompt that is currently displayed
    pub fn format_event(
        event: &ServerEvent,
        own_name: &str,
        received_at: DateTime<Local>,
    ) -> String {
        let time = received_at.format("%H:%M:%S");

        match event {
            ServerEvent::Online(name) => format!("\n[{}] + {} is online\n", time, name),
            ServerEvent::Offline(name) => format!("\n[{}] - {} went offline\n", time, name),
            ServerEvent::Message { from, body } if from == own_name => {
                format!("\n[{}] @{} (me): {}\n", time, from, body)
            }
            ServerEvent::Message { from, body } => format!("\n[{}] @{}: {}\n", time, from, body),
            ServerEvent::LoginOk => format!("\n[{}] logged in as {}\n", time, own_name),
            ServerEvent::UnknownCommand(_) | ServerEvent::Notice(_) => {
                format!("\n[{}] server: {}\n", time, event)
            }
        }
    }
}
