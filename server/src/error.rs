use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure on one client connection. Terminal for that session only.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to read from connection: {0}")]
    Read(#[source] io::Error),
    #[error("failed to write to connection: {0}")]
    Write(#[source] io::Error),
}

/// Failure touching the history log. Callers log these and carry on.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to append to history log {}: {source}", path.display())]
    Append {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read history log {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Fatal errors raised before the server starts accepting clients.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
}

/// The broadcaster task has stopped and no longer accepts events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("broadcaster is no longer running")]
pub struct BroadcasterClosed;
