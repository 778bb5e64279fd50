//! Parley: a line-oriented TCP chat relay.
//!
//! Every line a client sends is either a control command (`/history`,
//! `/users`) answered directly, or a chat message that is appended to the
//! history log and broadcast to all connected clients with a timestamp.

pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod logging;
pub mod net;
pub mod state;
