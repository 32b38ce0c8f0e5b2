//! UI utilities for the client.

use std::io::Write;

/// Redisplay the prompt after printing a server event
pub fn redisplay_prompt(name: &str) {
    print!("{}> ", name);
    std::io::stdout().flush().ok();
}
