pub mod connection;
pub mod formatter;
pub mod listener;
pub mod session;
