pub mod broadcaster;
pub mod command;
pub mod events;
pub mod registry;
pub mod user_session;
