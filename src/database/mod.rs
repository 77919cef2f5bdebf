pub mod admin_actions;
pub mod config;
pub mod connection;
pub mod matches;
pub mod models;
pub mod notifications;
pub mod players;
pub mod queue;
pub mod rewards;
pub mod setup;

pub use connection::{DbConn, DbPool, create_memory_pool, create_pool, get_connection};
pub use models::*;
