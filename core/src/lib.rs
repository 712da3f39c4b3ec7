//! ircrelay core
//!
//! This crate provides the protocol state machine for a single-server chat
//! relay speaking RFC 1459/2812: session registration, channels with privilege
//! ranks and access lists, the mode change engine and command dispatch.

pub mod channel;
pub mod client;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod message;
pub mod mode_change;
pub mod modes;
pub mod motd;
pub mod numeric;
pub mod registry;
pub mod server;
pub mod user;
pub mod utils;

pub use channel::Channel;
pub use client::{Client, ClientId, ClientState};
pub use config::Config;
pub use error::{Error, Result};
pub use message::{Message, MessageType, Prefix};
pub use motd::MotdManager;
pub use numeric::NumericReply;
pub use registry::Registry;
pub use server::Server;
pub use user::User;

/// Re-exports for convenience
pub use tracing::{debug, error, info, warn};
