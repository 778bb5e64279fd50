use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use parley_server::config::RelayConfig;
use parley_server::logging;
use parley_server::net::listener::{bind, serve};
use parley_server::state::RelayState;

#[derive(Parser, Debug)]
#[command(name = "parley-server")]
#[command(about = "Line-oriented TCP chat relay", long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "parley.toml")]
    config: PathBuf,

    /// Address to listen on (overrides config and environment)
    #[arg(short, long)]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = RelayConfig::load(&args.config)?;
    if let Some(address) = args.address {
        config.server.address = address;
    }

    logging::init(&config.log.level);
    match &config.loaded_from {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => info!(
            "No config file found at {}, using defaults",
            args.config.display()
        ),
    }

    let listener = bind(&config.server.address).await?;

    let (state, broadcaster) = RelayState::new(&config);
    let broadcaster_task = tokio::spawn(broadcaster.run());

    info!(
        address = %config.server.address,
        history = %config.history.path.display(),
        "Parley server starting"
    );

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        shutdown.cancel();
    });

    serve(listener, state, cancel).await;

    // Connected clients keep the broadcaster alive until they disconnect
    broadcaster_task.abort();
    info!("Parley server stopped");
    Ok(())
}
