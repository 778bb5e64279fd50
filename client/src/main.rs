//! Interactive terminal client for the Parley chat relay.
//!
//! Prompts for a display name, then relays every line typed on stdin to the
//! server and prints every line the server sends back.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin parley-client
//! cargo run --bin parley-client -- --address 127.0.0.1:3335 --name Alice
//! ```

mod outgoing;

use std::io::Write;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use outgoing::outgoing_line;

const MSG_DISCONNECT: &str = "Disconnected from the server.";

#[derive(Parser, Debug)]
#[command(name = "parley-client")]
#[command(about = "Terminal client for the Parley chat relay", long_about = None)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "localhost:3335")]
    address: String,

    /// Display name (prompted for if omitted)
    #[arg(short, long)]
    name: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    let name = match args.name {
        Some(name) => name.trim().to_string(),
        None => {
            print!("Enter your name: ");
            std::io::stdout().flush()?;
            stdin.next_line().await?.unwrap_or_default().trim().to_string()
        }
    };

    let stream = match TcpStream::connect(&args.address).await {
        Ok(stream) => stream,
        Err(e) => {
            println!("Error connecting: {}", e);
            std::process::exit(1);
        }
    };
    println!("Connected to the server.");

    let (read_half, mut write_half) = stream.into_split();

    tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => println!("{}", line),
                Ok(None) => break,
                Err(e) => {
                    debug!(error = %e, "read from server failed");
                    break;
                }
            }
        }
        println!("{}", MSG_DISCONNECT);
        std::process::exit(0);
    });

    loop {
        let input = match stdin.next_line().await {
            Ok(Some(input)) => input,
            Ok(None) => std::process::exit(0),
            Err(e) => {
                println!("{}", e);
                std::process::exit(1);
            }
        };

        let mut line = outgoing_line(&name, &input);
        line.push('\n');
        if let Err(e) = write_half.write_all(line.as_bytes()).await {
            println!("{}", e);
            std::process::exit(1);
        }
    }
}
