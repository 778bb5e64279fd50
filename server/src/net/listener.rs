use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::StartupError;
use crate::state::RelayState;

use super::connection::handle_connection;

/// Bind the chat listener. Failing here is fatal for the process.
pub async fn bind(addr: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Accept connections and spawn a handler task for each.
/// Stops accepting new connections when the cancellation token is triggered.
pub async fn serve(listener: TcpListener, state: RelayState, cancel: CancellationToken) {
    match listener.local_addr() {
        Ok(addr) => info!("chat listener started on {}", addr),
        Err(_) => info!("chat listener started"),
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("chat listener shutting down");
                break;
            }
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        let state = state.clone();
                        let peer = addr.to_string();
                        tokio::spawn(async move {
                            handle_connection(stream, peer, state).await;
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "failed to accept connection");
                    }
                }
            }
        }
    }
}
