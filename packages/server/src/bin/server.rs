//! Line-based TCP chat relay.
//!
//! Clients log in with `login <name>`, chat with `msg <text>` and leave with
//! `logoff`. Every logged-in client sees every chat line and every
//! online/offline change.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin natter-server
//! cargo run --bin natter-server -- --host 127.0.0.1 --port 9000 --idle-timeout 600
//! ```

use std::time::Duration;

use clap::Parser;

use natter_server::{Server, ServerConfig, domain::DEFAULT_MAILBOX_CAPACITY};
use natter_shared::{
    codec::{DEFAULT_MAX_LINE_LENGTH, DEFAULT_PORT},
    logger::setup_logger,
};

#[derive(Parser, Debug)]
#[command(name = "natter-server")]
#[command(about = "Line-based TCP chat relay with presence notifications", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Longest accepted line from a client, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_LENGTH)]
    max_line_length: usize,

    /// Disconnect clients that send nothing for this many seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    idle_timeout: Option<u64>,

    /// Events queued for one client before it is dropped as not reading
    #[arg(
        long,
        default_value_t = DEFAULT_MAILBOX_CAPACITY,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    mailbox_capacity: usize,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            max_line_length: args.max_line_length,
            idle_timeout: args.idle_timeout.map(Duration::from_secs),
            mailbox_capacity: args.mailbox_capacity,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let server = match Server::bind(args.into()).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Server error: {}", e);
            std::process::exit(1);
        }
    };

    server.run().await;
}
