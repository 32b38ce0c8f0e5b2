//! Terminal chat client for the natter relay.
//!
//! Logs in with the given name, prints presence changes and chat lines, and
//! sends every line typed at the prompt as a chat message. `/quit`, Ctrl+C or
//! Ctrl+D log off.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin natter-client -- --name alice
//! cargo run --bin natter-client -- -H 10.0.0.5 -p 8818 -n bob
//! ```

use clap::Parser;

use natter_client::session::run_client_session;
use natter_shared::{codec::DEFAULT_PORT, logger::setup_logger};

#[derive(Parser, Debug)]
#[command(name = "natter-client")]
#[command(about = "Terminal client for the natter chat relay", long_about = None)]
struct Args {
    /// Display name to log in with (letters, digits and '_')
    #[arg(short = 'n', long)]
    name: String,

    /// Server host
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let addr = format!("{}:{}", args.host, args.port);
    if let Err(e) = run_client_session(&addr, &args.name).await {
        tracing::error!("Client error: {}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
