use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::engine::broadcaster::DEFAULT_EVENT_QUEUE;
use crate::engine::user_session::{DEFAULT_OUTBOUND_QUEUE, DEFAULT_REPLY_QUEUE};
use crate::error::StartupError;

/// Top-level relay configuration, loaded from parley.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerSection,
    pub history: HistorySection,
    pub broadcast: BroadcastSection,
    pub log: LogSection,
    /// File the settings were read from; `None` when running on defaults.
    #[serde(skip)]
    pub loaded_from: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Address the chat listener binds to.
    pub address: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:3335".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HistorySection {
    /// Append-only log of every chat line, one per line.
    pub path: PathBuf,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("chat_history.txt"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BroadcastSection {
    /// Capacity of the broadcaster's event stream. Submitters wait while it is full.
    pub event_queue: usize,
    /// Per-session delivery queue. Messages for a peer whose queue is full are dropped.
    pub outbound_queue: usize,
    /// Per-session queue of direct replies. A client that stops reading stalls
    /// only its own requests once this fills.
    pub reply_queue: usize,
}

impl Default for BroadcastSection {
    fn default() -> Self {
        Self {
            event_queue: DEFAULT_EVENT_QUEUE,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            reply_queue: DEFAULT_REPLY_QUEUE,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Default filter when RUST_LOG is unset.
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl RelayConfig {
    /// Load config from a TOML file. Falls back to defaults if the file doesn't exist.
    /// Environment variables override TOML values. Runs before logging is set
    /// up, so callers report `loaded_from` themselves.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StartupError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).map_err(|source| StartupError::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                })?;
            let mut config =
                Self::from_toml(&contents).map_err(|source| StartupError::ConfigParse {
                    path: path.to_path_buf(),
                    source,
                })?;
            config.loaded_from = Some(path.to_path_buf());
            config
        } else {
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("PARLEY_ADDRESS") {
            self.server.address = v;
        }
        if let Some(v) = var("PARLEY_HISTORY_PATH") {
            self.history.path = PathBuf::from(v);
        }
        if let Some(v) = var("PARLEY_EVENT_QUEUE")
            && let Ok(n) = v.parse()
        {
            self.broadcast.event_queue = n;
        }
        if let Some(v) = var("PARLEY_OUTBOUND_QUEUE")
            && let Ok(n) = v.parse()
        {
            self.broadcast.outbound_queue = n;
        }
        if let Some(v) = var("PARLEY_REPLY_QUEUE")
            && let Ok(n) = v.parse()
        {
            self.broadcast.reply_queue = n;
        }
        if let Some(v) = var("PARLEY_LOG_LEVEL") {
            self.log.level = v;
        }
    }
}
