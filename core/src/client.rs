//! Client session

use crate::{Error, Message, Prefix, Result, User};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Stable identifier of a session
pub type ClientId = Uuid;

/// Registration state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Waiting for NICK and USER
    Unregistered,
    /// Welcome burst sent
    Registered,
}

/// One connected client
#[derive(Debug)]
pub struct Client {
    /// Unique client ID
    pub id: ClientId,
    /// Registration state
    pub state: ClientState,
    /// Identity and personal modes
    pub user: User,
    /// Remote address
    pub remote_addr: String,
    /// Outbound queue drained by the connection writer
    sender: mpsc::UnboundedSender<Message>,
}

impl Client {
    /// Create a new client
    pub fn new(
        id: ClientId,
        remote_addr: String,
        sender: mpsc::UnboundedSender<Message>,
    ) -> Self {
        let host = remote_addr
            .rsplit_once(':')
            .map(|(ip, _port)| ip.trim_matches(['[', ']']).to_string())
            .unwrap_or_else(|| remote_addr.clone());

        Self {
            id,
            state: ClientState::Unregistered,
            user: User::new(host),
            remote_addr,
            sender,
        }
    }

    /// Queue a message for the client
    pub fn send(&self, message: Message) -> Result<()> {
        self.sender
            .send(message)
            .map_err(|_| Error::QueueClosed(self.id))
    }

    /// Queue a server-originated message, stamping the server prefix
    pub fn send_from_server(&self, server_name: &str, mut message: Message) -> Result<()> {
        message.prefix = Some(Prefix::Server(server_name.to_string()));
        self.send(message)
    }

    /// Check if client is registered
    pub fn is_registered(&self) -> bool {
        self.state == ClientState::Registered
    }

    pub fn nick(&self) -> &str {
        self.user.nick()
    }

    pub fn prefix(&self) -> Prefix {
        self.user.prefix()
    }
}
